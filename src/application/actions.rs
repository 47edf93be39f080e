use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    application::{
        app::AppState,
        refresh::Source,
        state::NotificationLevel,
    },
    domain::{
        error::DashboardError,
        settings::{Settings, SettingsDraft},
    },
    interfaces::render::Panel,
    proxy::CloudUsageUpdate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    SpawnAgent,
    QuickSpawn,
    TriggerCron,
    ToggleWorkflow,
    TerminateSession,
    SaveSettings,
    SaveCloudUsage,
    RunPoller,
    ReindexNotes,
}

impl ActionKind {
    pub const ALL: [Self; 9] = [
        Self::SpawnAgent,
        Self::QuickSpawn,
        Self::TriggerCron,
        Self::ToggleWorkflow,
        Self::TerminateSession,
        Self::SaveSettings,
        Self::SaveCloudUsage,
        Self::RunPoller,
        Self::ReindexNotes,
    ];

    fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SpawnAgent => "spawn agent",
            Self::QuickSpawn => "quick spawn",
            Self::TriggerCron => "run cron job",
            Self::ToggleWorkflow => "toggle workflow",
            Self::TerminateSession => "terminate session",
            Self::SaveSettings => "save settings",
            Self::SaveCloudUsage => "save cloud usage",
            Self::RunPoller => "run poller",
            Self::ReindexNotes => "reindex notes",
        }
    }

    /// What to re-fetch after a successful call. `None` means everything.
    #[must_use]
    pub fn refresh_targets(self) -> Option<&'static [Source]> {
        match self {
            Self::SpawnAgent | Self::QuickSpawn | Self::TerminateSession => {
                Some(&[Source::Sessions])
            }
            Self::TriggerCron => Some(&[Source::CronJobs]),
            Self::ToggleWorkflow => Some(&[Source::Workflows]),
            Self::SaveCloudUsage => Some(&[Source::Inference]),
            Self::RunPoller => Some(&[Source::Pollers, Source::PollerHistory]),
            Self::ReindexNotes => Some(&[Source::Notes]),
            Self::SaveSettings => None,
        }
    }

    /// Regions holding this action's forms; they disable while it is busy.
    #[must_use]
    pub fn panels(self) -> &'static [Panel] {
        match self {
            Self::SpawnAgent | Self::QuickSpawn => &[Panel::Agents],
            Self::TerminateSession => &[Panel::Sessions],
            Self::TriggerCron => &[Panel::CronJobs],
            Self::ToggleWorkflow => &[Panel::Workflows],
            Self::SaveSettings => &[Panel::Settings],
            Self::SaveCloudUsage => &[Panel::Inference],
            Self::RunPoller => &[Panel::Pollers],
            Self::ReindexNotes => &[Panel::Notes],
        }
    }
}

/// Per-action lifecycle: Idle → Submitting → (Refreshing →) Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPhase {
    Idle,
    Submitting,
    Refreshing,
}

/// Raw cloud quota form fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CloudUsageDraft {
    pub session_usage: String,
    pub session_reset: String,
    pub weekly_usage: String,
    pub weekly_reset: String,
}

impl CloudUsageDraft {
    pub fn validate(&self) -> Result<CloudUsageUpdate, DashboardError> {
        Ok(CloudUsageUpdate {
            session_usage: parse_percent("session usage", &self.session_usage)?,
            session_reset: non_empty(&self.session_reset),
            weekly_usage: parse_percent("weekly usage", &self.weekly_usage)?,
            weekly_reset: non_empty(&self.weekly_reset),
        })
    }
}

#[derive(Debug, Clone)]
pub enum ActionRequest {
    SpawnAgent { agent_id: String, task: String },
    QuickSpawn { agent_id: String },
    TriggerCron { job_id: String },
    ToggleWorkflow { workflow_id: String, currently_active: bool },
    TerminateSession { session_key: String },
    SaveSettings { draft: SettingsDraft },
    SaveCloudUsage { draft: CloudUsageDraft },
    RunPoller { provider: String },
    ReindexNotes,
}

impl ActionRequest {
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::SpawnAgent { .. } => ActionKind::SpawnAgent,
            Self::QuickSpawn { .. } => ActionKind::QuickSpawn,
            Self::TriggerCron { .. } => ActionKind::TriggerCron,
            Self::ToggleWorkflow { .. } => ActionKind::ToggleWorkflow,
            Self::TerminateSession { .. } => ActionKind::TerminateSession,
            Self::SaveSettings { .. } => ActionKind::SaveSettings,
            Self::SaveCloudUsage { .. } => ActionKind::SaveCloudUsage,
            Self::RunPoller { .. } => ActionKind::RunPoller,
            Self::ReindexNotes => ActionKind::ReindexNotes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Local validation failed; nothing was sent.
    Rejected(String),
    Failed(String),
    Succeeded(String),
    /// A newer call of the same kind started first; this response was dropped.
    Superseded,
}

/// Validated, ready-to-send form of an [`ActionRequest`].
#[derive(Debug, Clone)]
enum PreparedAction {
    Spawn { agent_id: String, task: String },
    TriggerCron { job_id: String },
    SetWorkflowActive { workflow_id: String, active: bool },
    Terminate { session_key: String },
    SaveSettings { settings: Settings },
    SaveCloudUsage { update: CloudUsageUpdate },
    RunPoller { provider: String },
    ReindexNotes,
}

/// Monotonic ticket per action kind. Only the holder of the latest ticket may apply
/// its response.
#[derive(Debug, Default)]
pub struct InFlight {
    latest: [AtomicU64; ActionKind::ALL.len()],
}

impl InFlight {
    pub fn begin(&self, kind: ActionKind) -> u64 {
        self.latest[kind.index()].fetch_add(1, Ordering::SeqCst) + 1
    }

    #[must_use]
    pub fn is_current(&self, kind: ActionKind, token: u64) -> bool {
        self.latest[kind.index()].load(Ordering::SeqCst) == token
    }
}

impl AppState {
    pub async fn dispatch(&self, request: ActionRequest) -> ActionOutcome {
        let kind = request.kind();
        let prepared = match self.prepare(request).await {
            Ok(prepared) => prepared,
            Err(error) => {
                let message = error.user_message();
                warn!("{} rejected: {error}", kind.label());
                self.store().notify(NotificationLevel::Error, &message).await;
                self.render_notifications().await;
                return ActionOutcome::Rejected(message);
            }
        };

        let token = self.in_flight().begin(kind);
        self.set_phase(kind, ActionPhase::Submitting).await;
        debug!("{} submitting (token {token})", kind.label());

        let result = self.submit(&prepared).await;

        if !self.in_flight().is_current(kind, token) {
            debug!("{} response superseded (token {token})", kind.label());
            return ActionOutcome::Superseded;
        }

        match result {
            Ok(payload) => {
                let message = success_message(&prepared, &payload);
                info!("{} succeeded: {message}", kind.label());
                self.store()
                    .notify(NotificationLevel::Success, &message)
                    .await;
                self.set_phase(kind, ActionPhase::Refreshing).await;

                if !self.config().action_refresh_delay.is_zero() {
                    tokio::time::sleep(self.config().action_refresh_delay).await;
                }
                match kind.refresh_targets() {
                    Some(sources) => {
                        self.refresh_sources(sources).await;
                    }
                    None => {
                        self.load_settings().await;
                        self.refresh_all().await;
                    }
                }

                if self.in_flight().is_current(kind, token) {
                    self.set_phase(kind, ActionPhase::Idle).await;
                }
                ActionOutcome::Succeeded(message)
            }
            Err(error) => {
                let message = format!("{} failed: {}", kind.label(), error.user_message());
                warn!("{} failed: {error}", kind.label());
                self.store().notify(NotificationLevel::Error, &message).await;
                self.set_phase(kind, ActionPhase::Idle).await;
                ActionOutcome::Failed(message)
            }
        }
    }

    /// Records the phase and redraws every region that reflects it.
    async fn set_phase(&self, kind: ActionKind, phase: ActionPhase) {
        self.store().set_action_phase(kind, phase).await;
        self.render_action(kind).await;
    }

    async fn prepare(&self, request: ActionRequest) -> Result<PreparedAction, DashboardError> {
        match request {
            ActionRequest::SpawnAgent { agent_id, task } => {
                let agent_id = required("agent", &agent_id)?;
                let task = required("task", &task)?;
                Ok(PreparedAction::Spawn { agent_id, task })
            }
            ActionRequest::QuickSpawn { agent_id } => {
                let agent_id = required("agent", &agent_id)?;
                let task = self
                    .registry()
                    .quick_task(&agent_id)
                    .ok_or_else(|| {
                        DashboardError::Validation(format!("no quick task for agent {agent_id}"))
                    })?
                    .to_owned();
                Ok(PreparedAction::Spawn { agent_id, task })
            }
            ActionRequest::TriggerCron { job_id } => Ok(PreparedAction::TriggerCron {
                job_id: required("job id", &job_id)?,
            }),
            ActionRequest::ToggleWorkflow {
                workflow_id,
                currently_active,
            } => Ok(PreparedAction::SetWorkflowActive {
                workflow_id: required("workflow id", &workflow_id)?,
                active: !currently_active,
            }),
            ActionRequest::TerminateSession { session_key } => Ok(PreparedAction::Terminate {
                session_key: required("session key", &session_key)?,
            }),
            ActionRequest::SaveSettings { draft } => {
                let base = self
                    .store()
                    .read()
                    .await
                    .settings
                    .value()
                    .cloned()
                    .unwrap_or_default();
                Ok(PreparedAction::SaveSettings {
                    settings: draft.apply_to(&base)?,
                })
            }
            ActionRequest::SaveCloudUsage { draft } => Ok(PreparedAction::SaveCloudUsage {
                update: draft.validate()?,
            }),
            ActionRequest::RunPoller { provider } => Ok(PreparedAction::RunPoller {
                provider: required("provider", &provider)?,
            }),
            ActionRequest::ReindexNotes => Ok(PreparedAction::ReindexNotes),
        }
    }

    async fn submit(&self, prepared: &PreparedAction) -> Result<Value, DashboardError> {
        let client = self.client();
        match prepared {
            PreparedAction::Spawn { agent_id, task } => client.spawn_session(agent_id, task).await,
            PreparedAction::TriggerCron { job_id } => client.run_cron_job(job_id).await,
            PreparedAction::SetWorkflowActive {
                workflow_id,
                active,
            } => client.set_workflow_active(workflow_id, *active).await,
            PreparedAction::Terminate { session_key } => {
                client.terminate_session(session_key).await
            }
            PreparedAction::SaveSettings { settings } => client.save_settings(settings).await,
            PreparedAction::SaveCloudUsage { update } => client.save_cloud_usage(update).await,
            PreparedAction::RunPoller { provider } => client.run_poller(provider).await,
            PreparedAction::ReindexNotes => client.reindex_notes().await,
        }
    }
}

fn success_message(prepared: &PreparedAction, payload: &Value) -> String {
    match prepared {
        PreparedAction::Spawn { agent_id, .. } => {
            let session = payload
                .get("sessionKey")
                .or_else(|| payload.pointer("/result/details/childSessionKey"))
                .and_then(Value::as_str);
            match session {
                Some(key) => format!("spawned {agent_id} ({key})"),
                None => format!("spawned {agent_id}"),
            }
        }
        PreparedAction::TriggerCron { job_id } => format!("triggered cron job {job_id}"),
        PreparedAction::SetWorkflowActive { active: true, .. } => "workflow activated".to_owned(),
        PreparedAction::SetWorkflowActive { active: false, .. } => {
            "workflow deactivated".to_owned()
        }
        PreparedAction::Terminate { .. } => "session terminated".to_owned(),
        PreparedAction::SaveSettings { .. } => "settings saved".to_owned(),
        PreparedAction::SaveCloudUsage { .. } => "cloud usage saved".to_owned(),
        PreparedAction::RunPoller { provider } => format!("{provider} poller ran"),
        PreparedAction::ReindexNotes => match payload.get("indexed").and_then(Value::as_u64) {
            Some(count) => format!("notes reindexed ({count})"),
            None => "notes reindexed".to_owned(),
        },
    }
}

fn required(field: &str, input: &str) -> Result<String, DashboardError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DashboardError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}

fn non_empty(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn parse_percent(field: &str, input: &str) -> Result<Option<f64>, DashboardError> {
    let trimmed = input.trim().trim_end_matches('%').trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if (0.0..=100.0).contains(&value) => Ok(Some(value)),
        _ => Err(DashboardError::Validation(format!(
            "{field} must be a percentage between 0 and 100"
        ))),
    }
}
