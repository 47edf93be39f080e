use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    application::app::AppState, domain::error::DashboardError, interfaces::render::Panel,
};

/// One independently fetched proxy endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Gateway,
    Sessions,
    CronJobs,
    Workflows,
    Usage,
    Inference,
    BlogPosts,
    Notes,
    History,
    Pollers,
    PollerHistory,
}

impl Source {
    pub const ALL: [Self; 11] = [
        Self::Gateway,
        Self::Sessions,
        Self::CronJobs,
        Self::Workflows,
        Self::Usage,
        Self::Inference,
        Self::BlogPosts,
        Self::Notes,
        Self::History,
        Self::Pollers,
        Self::PollerHistory,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Gateway => "gateway",
            Self::Sessions => "sessions",
            Self::CronJobs => "cron",
            Self::Workflows => "workflows",
            Self::Usage => "usage",
            Self::Inference => "inference",
            Self::BlogPosts => "blog",
            Self::Notes => "notes",
            Self::History => "history",
            Self::Pollers => "pollers",
            Self::PollerHistory => "poller history",
        }
    }

    /// Regions that read this source.
    #[must_use]
    pub fn panels(self) -> &'static [Panel] {
        match self {
            Self::Gateway => &[Panel::Gateway],
            Self::Sessions => &[Panel::Sessions, Panel::Activity, Panel::Agents],
            Self::CronJobs => &[Panel::CronJobs],
            Self::Workflows => &[Panel::Workflows],
            Self::Usage => &[Panel::Usage, Panel::UsageEvents],
            Self::Inference => &[Panel::Inference],
            Self::BlogPosts => &[Panel::BlogPosts],
            Self::Notes => &[Panel::Notes],
            Self::History => &[Panel::History],
            Self::Pollers | Self::PollerHistory => &[Panel::Pollers],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source: Source,
    pub error: Option<String>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcomes: Vec<SourceOutcome>,
    pub elapsed: Duration,
}

impl CycleReport {
    #[must_use]
    pub fn ok_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.error.is_none())
            .count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.error.is_some())
    }

    #[must_use]
    pub fn outcome(&self, source: Source) -> Option<&SourceOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.source == source)
    }
}

fn failure<T>(result: &Result<T, DashboardError>) -> Option<String> {
    result.as_ref().err().map(ToString::to_string)
}

impl AppState {
    pub async fn refresh_all(&self) -> CycleReport {
        self.refresh_sources(&Source::ALL).await
    }

    /// Fetches every listed source concurrently and waits for all of them; one failure
    /// never short-circuits the rest.
    pub async fn refresh_sources(&self, sources: &[Source]) -> CycleReport {
        let started = Instant::now();
        let outcomes = join_all(sources.iter().map(|source| self.refresh_source(*source))).await;
        let report = CycleReport {
            outcomes,
            elapsed: started.elapsed(),
        };

        let failed = report
            .failed()
            .map(|outcome| outcome.source.label())
            .collect::<Vec<_>>();
        if failed.is_empty() {
            info!(
                "refresh cycle: {}/{} sources ok in {} ms",
                report.ok_count(),
                report.outcomes.len(),
                report.elapsed.as_millis()
            );
        } else {
            info!(
                "refresh cycle: {}/{} sources ok in {} ms, failed: {}",
                report.ok_count(),
                report.outcomes.len(),
                report.elapsed.as_millis(),
                failed.join(", ")
            );
        }
        self.render_panels(&[Panel::Controls]).await;
        report
    }

    async fn refresh_source(&self, source: Source) -> SourceOutcome {
        let started = Instant::now();
        let client = self.client();
        let store = self.store();

        let error = match source {
            Source::Gateway => {
                let result = client.gateway_health().await;
                let error = failure(&result);
                store.apply_gateway(result).await;
                error
            }
            Source::Sessions => {
                let result = client.sessions().await;
                let error = failure(&result);
                store.apply_sessions(result).await;
                error
            }
            Source::CronJobs => {
                let result = client.cron_jobs().await;
                let error = failure(&result);
                store.apply_cron_jobs(result).await;
                error
            }
            Source::Workflows => {
                let result = client.workflows().await;
                let error = failure(&result);
                store.apply_workflows(result).await;
                error
            }
            Source::Usage => {
                let result = client.usage().await;
                let error = failure(&result);
                store.apply_usage(result).await;
                error
            }
            Source::Inference => {
                let result = client.inference_status().await;
                let error = failure(&result);
                store.apply_inference(result).await;
                error
            }
            Source::BlogPosts => {
                let result = client.blog_posts().await;
                let error = failure(&result);
                store.apply_blog_posts(result).await;
                error
            }
            Source::Notes => {
                let result = client.learning_notes().await;
                let error = failure(&result);
                store.apply_notes(result).await;
                error
            }
            Source::History => {
                let result = client.schedule_history().await;
                let error = failure(&result);
                store.apply_history(result).await;
                error
            }
            Source::Pollers => {
                let result = client.poller_status().await;
                let error = failure(&result);
                store.apply_pollers(result).await;
                error
            }
            Source::PollerHistory => {
                let result = client
                    .poller_history(self.config().poller_history_days)
                    .await;
                let error = failure(&result);
                store.apply_poller_history(result).await;
                error
            }
        };

        if let Some(error) = &error {
            warn!("{} refresh failed: {error}", source.label());
        }
        self.render_panels(source.panels()).await;

        SourceOutcome {
            source,
            error,
            elapsed: started.elapsed(),
        }
    }

    /// Loads settings into the store. A failure keeps whatever was loaded before.
    pub async fn load_settings(&self) {
        let result = self.client().settings().await;
        if let Err(error) = &result {
            warn!("settings load failed: {error}");
        }
        self.store().apply_settings(result).await;
        self.render_panels(&[Panel::Settings, Panel::Countdown]).await;
    }
}

/// Network refresh on a fixed period. Ticks keep firing while auto-refresh is off but
/// fetch nothing.
pub fn spawn_refresh_ticker(state: AppState, shutdown: CancellationToken) -> JoinHandle<()> {
    let period = state.config().refresh_interval;
    tokio::spawn(async move {
        let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if state.store().auto_refresh().await {
                        state.refresh_all().await;
                    } else {
                        debug!("auto-refresh off, skipping refresh tick");
                    }
                }
            }
        }
        debug!("refresh ticker stopped");
    })
}

/// Local-only tick for the countdown region.
pub fn spawn_countdown_ticker(state: AppState, shutdown: CancellationToken) -> JoinHandle<()> {
    let period = state.config().countdown_tick;
    tokio::spawn(async move {
        let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => state.tick_countdown().await,
            }
        }
        debug!("countdown ticker stopped");
    })
}
