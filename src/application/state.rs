use std::{collections::BTreeMap, sync::Arc, time::Duration};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::{
    application::actions::{ActionKind, ActionPhase},
    domain::{
        error::DashboardError,
        models::{
            ActivityItem, BlogPost, CronJob, HistoryEntry, InferenceStatus, LearningNote,
            PollerHistory, PollerStatus, Session, UsageReport, Workflow,
        },
        settings::Settings,
    },
    view::{activity::build_activity, usage::EventFilter},
};

pub fn now_unix_ms() -> u64 {
    match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
        Ok(duration) => u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        Err(_) => 0,
    }
}

/// Latest fetch result for one source. A failure keeps the previous value.
#[derive(Debug, Clone)]
pub struct Feed<T> {
    value: Option<T>,
    error: Option<String>,
    refreshed_at_ms: Option<u64>,
    failed_at_ms: Option<u64>,
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self {
            value: None,
            error: None,
            refreshed_at_ms: None,
            failed_at_ms: None,
        }
    }
}

impl<T> Feed<T> {
    pub fn apply(&mut self, result: Result<T, DashboardError>, now_ms: u64) {
        match result {
            Ok(value) => {
                self.value = Some(value);
                self.error = None;
                self.refreshed_at_ms = Some(now_ms);
            }
            Err(error) => {
                self.error = Some(error.user_message());
                self.failed_at_ms = Some(now_ms);
            }
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn refreshed_at_ms(&self) -> Option<u64> {
        self.refreshed_at_ms
    }

    #[must_use]
    pub fn failed_at_ms(&self) -> Option<u64> {
        self.failed_at_ms
    }

    /// Present value that the latest fetch could not confirm.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.value.is_some() && self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

/// UI toggles and filters; changed by the viewer, never by a fetch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub auto_refresh: bool,
    pub hide_internal: bool,
    pub usage_filter: EventFilter,
    pub schedule_hour: u8,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub gateway: Feed<Value>,
    pub gateway_online: bool,
    pub sessions: Feed<Vec<Session>>,
    pub activity: Vec<ActivityItem>,
    pub cron_jobs: Feed<Vec<CronJob>>,
    pub workflows: Feed<Vec<Workflow>>,
    pub usage: Feed<UsageReport>,
    pub inference: Feed<InferenceStatus>,
    pub inference_online: bool,
    pub blog_posts: Feed<Vec<BlogPost>>,
    pub notes: Feed<Vec<LearningNote>>,
    pub history: Feed<Vec<HistoryEntry>>,
    pub pollers: Feed<Vec<PollerStatus>>,
    pub poller_history: Feed<PollerHistory>,
    pub settings: Feed<Settings>,
    pub view: ViewState,
    pub notifications: Vec<Notification>,
    pub actions: BTreeMap<ActionKind, ActionPhase>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            hide_internal: false,
            usage_filter: EventFilter::default(),
            schedule_hour: 23,
        }
    }
}

impl DashboardState {
    #[must_use]
    pub fn action_phase(&self, kind: ActionKind) -> ActionPhase {
        self.actions.get(&kind).copied().unwrap_or(ActionPhase::Idle)
    }

    pub fn active_notifications(&self, now_ms: u64) -> impl Iterator<Item = &Notification> {
        self.notifications
            .iter()
            .filter(move |notification| notification.expires_at_ms > now_ms)
    }
}

/// Single owner of the dashboard snapshot. Readers take a shared guard; every write
/// goes through one of the methods below.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<RwLock<DashboardState>>,
    notification_ttl: Duration,
}

impl StateStore {
    #[must_use]
    pub fn new(view: ViewState, notification_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(DashboardState {
                view,
                ..DashboardState::default()
            })),
            notification_ttl,
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, DashboardState> {
        self.inner.read().await
    }

    pub async fn apply_gateway(&self, result: Result<Value, DashboardError>) {
        let mut state = self.inner.write().await;
        state.gateway_online = result.is_ok();
        state.gateway.apply(result, now_unix_ms());
    }

    /// Replaces sessions and re-derives the activity feed from whatever sessions are
    /// now current.
    pub async fn apply_sessions(&self, result: Result<Vec<Session>, DashboardError>) {
        let mut state = self.inner.write().await;
        state.sessions.apply(result, now_unix_ms());
        let activity = state
            .sessions
            .value()
            .map(|sessions| build_activity(sessions))
            .unwrap_or_default();
        state.activity = activity;
    }

    pub async fn apply_cron_jobs(&self, result: Result<Vec<CronJob>, DashboardError>) {
        self.inner.write().await.cron_jobs.apply(result, now_unix_ms());
    }

    pub async fn apply_workflows(&self, result: Result<Vec<Workflow>, DashboardError>) {
        self.inner.write().await.workflows.apply(result, now_unix_ms());
    }

    pub async fn apply_usage(&self, result: Result<UsageReport, DashboardError>) {
        self.inner.write().await.usage.apply(result, now_unix_ms());
    }

    pub async fn apply_inference(&self, result: Result<InferenceStatus, DashboardError>) {
        let mut state = self.inner.write().await;
        state.inference_online = result
            .as_ref()
            .map(|status| status.local.online)
            .unwrap_or(false);
        state.inference.apply(result, now_unix_ms());
    }

    pub async fn apply_blog_posts(&self, result: Result<Vec<BlogPost>, DashboardError>) {
        self.inner.write().await.blog_posts.apply(result, now_unix_ms());
    }

    pub async fn apply_notes(&self, result: Result<Vec<LearningNote>, DashboardError>) {
        self.inner.write().await.notes.apply(result, now_unix_ms());
    }

    pub async fn apply_history(&self, result: Result<Vec<HistoryEntry>, DashboardError>) {
        self.inner.write().await.history.apply(result, now_unix_ms());
    }

    pub async fn apply_pollers(&self, result: Result<Vec<PollerStatus>, DashboardError>) {
        self.inner.write().await.pollers.apply(result, now_unix_ms());
    }

    pub async fn apply_poller_history(&self, result: Result<PollerHistory, DashboardError>) {
        self.inner
            .write()
            .await
            .poller_history
            .apply(result, now_unix_ms());
    }

    /// Stores loaded settings; a valid `scheduleHour` retargets the countdown.
    pub async fn apply_settings(&self, result: Result<Settings, DashboardError>) {
        let mut state = self.inner.write().await;
        if let Some(hour) = result.as_ref().ok().and_then(Settings::schedule_hour) {
            state.view.schedule_hour = hour;
        }
        state.settings.apply(result, now_unix_ms());
    }

    pub async fn set_auto_refresh(&self, enabled: bool) {
        self.inner.write().await.view.auto_refresh = enabled;
    }

    pub async fn auto_refresh(&self) -> bool {
        self.inner.read().await.view.auto_refresh
    }

    pub async fn set_hide_internal(&self, hidden: bool) {
        self.inner.write().await.view.hide_internal = hidden;
    }

    pub async fn set_usage_filter(&self, filter: EventFilter) {
        self.inner.write().await.view.usage_filter = filter;
    }

    pub async fn schedule_hour(&self) -> u8 {
        self.inner.read().await.view.schedule_hour
    }

    pub async fn set_action_phase(&self, kind: ActionKind, phase: ActionPhase) {
        let mut state = self.inner.write().await;
        if phase == ActionPhase::Idle {
            state.actions.remove(&kind);
        } else {
            state.actions.insert(kind, phase);
        }
    }

    pub async fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let now = now_unix_ms();
        let ttl = u64::try_from(self.notification_ttl.as_millis()).unwrap_or(u64::MAX);
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            level,
            message: message.into(),
            created_at_ms: now,
            expires_at_ms: now.saturating_add(ttl),
        };
        self.inner.write().await.notifications.push(notification);
    }

    /// Drops expired notifications, returning how many went away.
    pub async fn prune_notifications(&self, now_ms: u64) -> usize {
        let mut state = self.inner.write().await;
        let before = state.notifications.len();
        state
            .notifications
            .retain(|notification| notification.expires_at_ms > now_ms);
        before - state.notifications.len()
    }
}
