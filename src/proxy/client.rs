use std::time::Duration;

use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::{
    error::DashboardError,
    models::{
        BlogPost, CostPoint, CronJob, HistoryEntry, InferenceStatus, LearningNote, MemoryHit,
        NoteDocument, PollerHistory, PollerStatus, Session, UsageEvent, UsageReport,
        UsageSummary, Workflow,
    },
    settings::Settings,
};

use super::decode::{
    collection, document, mutation_result, object_or_default, raw_collection,
    reject_explicit_error,
};

pub const PATH_GATEWAY_HEALTH: &str = "/proxy/openclaw/health";
pub const PATH_SESSIONS: &str = "/proxy/openclaw/sessions";
pub const PATH_SESSIONS_SPAWN: &str = "/proxy/openclaw/sessions/spawn";
pub const PATH_SESSIONS_TERMINATE: &str = "/proxy/openclaw/sessions/terminate";
pub const PATH_CRON: &str = "/proxy/openclaw/cron";
pub const PATH_CRON_RUN: &str = "/proxy/openclaw/cron/run";
pub const PATH_WORKFLOWS: &str = "/proxy/n8n/workflows";
pub const PATH_USAGE: &str = "/proxy/usage";
pub const PATH_INFERENCE: &str = "/proxy/ollama";
pub const PATH_INFERENCE_CLOUD: &str = "/proxy/ollama/cloud";
pub const PATH_BLOG_POSTS: &str = "/proxy/blog/posts";
pub const PATH_NOTES: &str = "/proxy/openclaw/notes";
pub const PATH_NOTES_RAW: &str = "/proxy/openclaw/notes/raw";
pub const PATH_NOTES_REINDEX: &str = "/proxy/openclaw/reindex";
pub const PATH_HISTORY: &str = "/proxy/openclaw/history";
pub const PATH_MEMORY_SEARCH: &str = "/proxy/memory/search";
pub const PATH_LOGS: &str = "/proxy/logs";
pub const PATH_SETTINGS: &str = "/proxy/dashboard/settings";
pub const PATH_POLLERS_STATUS: &str = "/proxy/pollers/status";
pub const PATH_POLLERS_RUN: &str = "/proxy/pollers/run";
pub const PATH_POLLERS_HISTORY: &str = "/proxy/pollers/history";

const ERROR_BODY_PREVIEW: usize = 200;

/// Manually entered cloud inference quota, stored by the proxy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudUsageUpdate {
    pub session_usage: Option<f64>,
    pub session_reset: Option<String>,
    pub weekly_usage: Option<f64>,
    pub weekly_reset: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, DashboardError> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        Url::parse(&base_url).map_err(|error| {
            DashboardError::Validation(format!("invalid proxy base url {base_url}: {error}"))
        })?;

        let mut builder = reqwest::Client::builder().user_agent(concat!(
            "clawboard/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|error| {
            DashboardError::Unavailable(format!("failed to construct http client: {error}"))
        })?;

        Ok(Self { http, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn gateway_health(&self) -> Result<Value, DashboardError> {
        let payload = self.get(PATH_GATEWAY_HEALTH, &[]).await?;
        reject_explicit_error(&payload)?;
        if payload.get("ok").and_then(Value::as_bool) == Some(false) {
            return Err(DashboardError::Remote("gateway reported not ok".to_owned()));
        }
        Ok(payload)
    }

    pub async fn sessions(&self) -> Result<Vec<Session>, DashboardError> {
        let payload = self.get(PATH_SESSIONS, &[]).await?;
        reject_explicit_error(&payload)?;
        Ok(collection(&payload, &["sessions"]))
    }

    pub async fn cron_jobs(&self) -> Result<Vec<CronJob>, DashboardError> {
        let payload = self.get(PATH_CRON, &[]).await?;
        reject_explicit_error(&payload)?;
        Ok(collection(&payload, &["jobs"]))
    }

    pub async fn workflows(&self) -> Result<Vec<Workflow>, DashboardError> {
        let payload = self.get(PATH_WORKFLOWS, &[]).await?;
        reject_explicit_error(&payload)?;
        Ok(collection(&payload, &["data", "workflows"]))
    }

    pub async fn usage(&self) -> Result<UsageReport, DashboardError> {
        let payload = self.get(PATH_USAGE, &[]).await?;
        reject_explicit_error(&payload)?;
        let summary = payload
            .get("summary")
            .map(UsageSummary::from_value)
            .unwrap_or_default();
        let events = raw_collection(&payload, "events")
            .into_iter()
            .map(UsageEvent::from_value)
            .collect();
        Ok(UsageReport { summary, events })
    }

    pub async fn inference_status(&self) -> Result<InferenceStatus, DashboardError> {
        let payload = self.get(PATH_INFERENCE, &[]).await?;
        reject_explicit_error(&payload)?;
        Ok(object_or_default(&payload))
    }

    pub async fn blog_posts(&self) -> Result<Vec<BlogPost>, DashboardError> {
        let payload = self.get(PATH_BLOG_POSTS, &[]).await?;
        reject_explicit_error(&payload)?;
        Ok(collection(&payload, &["posts"]))
    }

    pub async fn learning_notes(&self) -> Result<Vec<LearningNote>, DashboardError> {
        let payload = self.get(PATH_NOTES, &[]).await?;
        reject_explicit_error(&payload)?;
        Ok(collection(&payload, &["notes"]))
    }

    pub async fn schedule_history(&self) -> Result<Vec<HistoryEntry>, DashboardError> {
        let payload = self.get(PATH_HISTORY, &[]).await?;
        reject_explicit_error(&payload)?;
        Ok(raw_collection(&payload, "history")
            .into_iter()
            .map(HistoryEntry::from_value)
            .collect())
    }

    pub async fn poller_status(&self) -> Result<Vec<PollerStatus>, DashboardError> {
        let payload = self.get(PATH_POLLERS_STATUS, &[]).await?;
        reject_explicit_error(&payload)?;
        Ok(collection(&payload, &["pollers"]))
    }

    /// Cost samples per provider over the last `days` days.
    pub async fn poller_history(&self, days: u32) -> Result<PollerHistory, DashboardError> {
        let payload = self
            .get(PATH_POLLERS_HISTORY, &[("days", days.to_string())])
            .await?;
        reject_explicit_error(&payload)?;
        let Some(history) = payload.get("history").and_then(Value::as_object) else {
            return Ok(PollerHistory::new());
        };
        Ok(history
            .iter()
            .map(|(provider, points)| {
                let mut points = collection::<CostPoint>(points, &[]);
                points.sort_by_key(|point| point.timestamp);
                (provider.clone(), points)
            })
            .collect())
    }

    pub async fn settings(&self) -> Result<Settings, DashboardError> {
        let payload = self.get(PATH_SETTINGS, &[]).await?;
        reject_explicit_error(&payload)?;
        Ok(payload
            .get("settings")
            .and_then(Value::as_object)
            .cloned()
            .map(Settings::from_map)
            .unwrap_or_default())
    }

    pub async fn memory_search(&self, query: &str) -> Result<Vec<MemoryHit>, DashboardError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let payload = self
            .get(PATH_MEMORY_SEARCH, &[("query", query.to_owned())])
            .await?;
        reject_explicit_error(&payload)?;
        Ok(collection(&payload, &["results"]))
    }

    pub async fn logs(&self, lines: usize) -> Result<Vec<String>, DashboardError> {
        let payload = self.get(PATH_LOGS, &[("lines", lines.to_string())]).await?;
        reject_explicit_error(&payload)?;
        Ok(collection(&payload, &["lines"]))
    }

    pub async fn note_raw(&self, path: &str) -> Result<NoteDocument, DashboardError> {
        let payload = self
            .get(PATH_NOTES_RAW, &[("path", path.to_owned())])
            .await?;
        reject_explicit_error(&payload)?;
        Ok(object_or_default(&payload))
    }

    pub async fn spawn_session(&self, agent_id: &str, task: &str) -> Result<Value, DashboardError> {
        self.post(
            self.url(PATH_SESSIONS_SPAWN)?,
            &json!({ "agentId": agent_id, "task": task }),
        )
        .await
    }

    pub async fn terminate_session(&self, session_key: &str) -> Result<Value, DashboardError> {
        self.post(
            self.url(PATH_SESSIONS_TERMINATE)?,
            &json!({ "sessionKey": session_key }),
        )
        .await
    }

    pub async fn run_cron_job(&self, job_id: &str) -> Result<Value, DashboardError> {
        self.post(self.url(PATH_CRON_RUN)?, &json!({ "jobId": job_id }))
            .await
    }

    pub async fn set_workflow_active(
        &self,
        workflow_id: &str,
        active: bool,
    ) -> Result<Value, DashboardError> {
        let mut url = self.url(PATH_WORKFLOWS)?;
        url.path_segments_mut()
            .map_err(|()| DashboardError::Validation("proxy base url cannot carry a path".to_owned()))?
            .push(workflow_id)
            .push(if active { "activate" } else { "deactivate" });
        self.post(url, &json!({})).await
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<Value, DashboardError> {
        self.post(self.url(PATH_SETTINGS)?, &json!({ "settings": settings }))
            .await
    }

    pub async fn save_cloud_usage(
        &self,
        update: &CloudUsageUpdate,
    ) -> Result<Value, DashboardError> {
        let body = serde_json::to_value(update)
            .map_err(|error| DashboardError::Decode(error.to_string()))?;
        self.post(self.url(PATH_INFERENCE_CLOUD)?, &body).await
    }

    pub async fn run_poller(&self, provider: &str) -> Result<Value, DashboardError> {
        let payload = self
            .post(self.url(PATH_POLLERS_RUN)?, &json!({ "provider": provider }))
            .await?;
        match payload.get("status").and_then(Value::as_str) {
            Some("not_found") => Err(DashboardError::Remote(format!(
                "no poller named {provider}"
            ))),
            Some("error") => Err(DashboardError::Remote(
                payload
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("poller failed")
                    .to_owned(),
            )),
            _ => Ok(payload),
        }
    }

    pub async fn reindex_notes(&self) -> Result<Value, DashboardError> {
        self.post(self.url(PATH_NOTES_REINDEX)?, &json!({})).await
    }

    fn url(&self, path: &str) -> Result<Url, DashboardError> {
        let joined = format!("{}{path}", self.base_url);
        Url::parse(&joined)
            .map_err(|error| DashboardError::Validation(format!("invalid url {joined}: {error}")))
    }

    /// A read whose body is not a JSON document is a failed fetch, so the caller keeps
    /// its last good value.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, DashboardError> {
        let url = self.url(path)?;
        let body = self.send(Method::GET, url, None, query).await?;
        document(&body).inspect_err(|error| debug!("unusable body from {path}: {error}"))
    }

    async fn post(&self, url: Url, body: &Value) -> Result<Value, DashboardError> {
        let path = url.path().to_owned();
        let text = self.send(Method::POST, url, Some(body), &[]).await?;
        let payload = if text.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&text).map_err(|error| {
                DashboardError::Decode(format!("invalid json from {path}: {error}"))
            })?
        };
        mutation_result(payload)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        query: &[(&str, String)],
    ) -> Result<String, DashboardError> {
        let mut request = self.http.request(method, url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|error| DashboardError::Transport(error.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| DashboardError::Transport(error.to_string()))?;

        if !status.is_success() {
            return Err(DashboardError::Status {
                status: status.as_u16(),
                message: status_message(&text),
            });
        }
        Ok(text)
    }
}

fn status_message(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<Value>(body) {
        if let Some(message) = super::decode::explicit_error(&payload) {
            return message;
        }
    }
    body.trim().chars().take(ERROR_BODY_PREVIEW).collect()
}
