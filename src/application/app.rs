use std::{sync::Arc, time::Instant};

use serde_json::{Value, json};

use crate::{
    application::{
        actions::{ActionKind, InFlight},
        config::RuntimeConfig,
        state::{StateStore, ViewState, now_unix_ms},
    },
    domain::{agents::AgentRegistry, error::DashboardError},
    interfaces::render::{Panel, RegionCache, RenderContext, render_panel},
    proxy::ProxyClient,
    view::usage::EventFilter,
};

/// Everything a handler, ticker or dispatcher needs, behind one cheap clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    config: RuntimeConfig,
    client: ProxyClient,
    store: StateStore,
    regions: RegionCache,
    in_flight: InFlight,
    started_at: Instant,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> Result<Self, DashboardError> {
        let client = ProxyClient::new(&config.proxy_url, config.request_timeout)?;
        let store = StateStore::new(
            ViewState {
                auto_refresh: config.auto_refresh,
                hide_internal: config.hide_internal,
                usage_filter: EventFilter::default(),
                schedule_hour: config.schedule_hour,
            },
            config.notification_ttl,
        );

        Ok(Self {
            inner: Arc::new(InnerState {
                client,
                store,
                regions: RegionCache::default(),
                in_flight: InFlight::default(),
                started_at: Instant::now(),
                config,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn client(&self) -> &ProxyClient {
        &self.inner.client
    }

    #[must_use]
    pub fn store(&self) -> &StateStore {
        &self.inner.store
    }

    #[must_use]
    pub fn regions(&self) -> &RegionCache {
        &self.inner.regions
    }

    #[must_use]
    pub fn registry(&self) -> &AgentRegistry {
        &self.inner.config.agents
    }

    #[must_use]
    pub fn in_flight(&self) -> &InFlight {
        &self.inner.in_flight
    }

    #[must_use]
    pub fn uptime_ms(&self) -> u64 {
        u64::try_from(self.inner.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Rewrites the given regions from one consistent snapshot of the store.
    pub async fn render_panels(&self, panels: &[Panel]) {
        let rendered = {
            let state = self.store().read().await;
            let context = RenderContext::now(self.registry(), &self.config().internal_provider);
            panels
                .iter()
                .map(|panel| (*panel, render_panel(*panel, &state, &context)))
                .collect::<Vec<_>>()
        };
        self.regions().replace(rendered).await;
    }

    pub async fn render_all(&self) {
        self.render_panels(&Panel::ALL).await;
    }

    pub async fn render_notifications(&self) {
        self.render_panels(&[Panel::Notifications, Panel::Controls])
            .await;
    }

    /// Notifications and controls plus every region carrying the action's forms.
    pub async fn render_action(&self, kind: ActionKind) {
        let mut panels = vec![Panel::Notifications, Panel::Controls];
        panels.extend_from_slice(kind.panels());
        self.render_panels(&panels).await;
    }

    /// Countdown tick: local recompute only, plus expiring old notifications.
    pub async fn tick_countdown(&self) {
        let expired = self.store().prune_notifications(now_unix_ms()).await;
        if expired > 0 {
            self.render_panels(&[Panel::Countdown, Panel::Notifications])
                .await;
        } else {
            self.render_panels(&[Panel::Countdown]).await;
        }
    }

    pub async fn health_payload(&self) -> Value {
        let state = self.store().read().await;
        json!({
            "ok": true,
            "uptimeMs": self.uptime_ms(),
            "proxyUrl": self.client().base_url(),
            "gatewayOnline": state.gateway_online,
            "inferenceOnline": state.inference_online,
            "autoRefresh": state.view.auto_refresh,
            "lastSessionsRefreshMs": state.sessions.refreshed_at_ms(),
        })
    }
}
