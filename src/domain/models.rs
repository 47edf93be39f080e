use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Key the usage store reserves for its grand total next to the providers.
pub const TOTAL_REQUESTS_KEY: &str = "total_requests";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Session {
    pub key: String,
    pub agent_id: Option<String>,
    pub updated_at: Option<u64>,
    pub age_ms: Option<u64>,
    pub total_tokens: Option<u64>,
    pub model: Option<String>,
    pub last_messages: Vec<SessionMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionMessage {
    pub role: String,
    pub content: Value,
    pub timestamp: Option<u64>,
}

impl SessionMessage {
    /// Flattens string content and `[{type, text}]` part lists into plain text.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.content {
            Value::String(text) => text.clone(),
            Value::Array(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    Value::String(text) => Some(text.as_str()),
                    other => other.get("text").and_then(Value::as_str),
                })
                .collect::<Vec<_>>()
                .join(" "),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJob {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub schedule: CronSchedule,
    #[serde(default)]
    pub state: CronJobState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CronSchedule {
    pub kind: String,
    pub expr: Option<String>,
    pub every_ms: Option<u64>,
    pub at: Option<String>,
    pub tz: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CronJobState {
    pub next_run_at_ms: Option<u64>,
    pub last_run_at_ms: Option<u64>,
    pub last_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    Task,
    Reply,
    Tool,
    Message,
    Session,
}

impl ActivityKind {
    #[must_use]
    pub fn from_role(role: &str) -> Self {
        match role {
            "user" => Self::Task,
            "assistant" => Self::Reply,
            "tool" | "toolResult" | "tool_result" => Self::Tool,
            _ => Self::Message,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Reply => "reply",
            Self::Tool => "tool",
            Self::Message => "message",
            Self::Session => "session",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub agent: String,
    pub summary: String,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelUsage {
    pub requests: u64,
    pub last: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderUsage {
    pub models: BTreeMap<String, ModelUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub providers: BTreeMap<String, ProviderUsage>,
    pub total_requests: u64,
}

impl UsageSummary {
    /// Reads the provider map. Entries that are not provider objects are ignored.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let mut summary = Self::default();
        let Some(object) = value.as_object() else {
            return summary;
        };

        for (key, entry) in object {
            if key == TOTAL_REQUESTS_KEY {
                summary.total_requests = entry.as_u64().unwrap_or_default();
                continue;
            }
            if let Ok(provider) = serde_json::from_value::<ProviderUsage>(entry.clone()) {
                summary.providers.insert(key.clone(), provider);
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageEvent {
    pub timestamp: Option<u64>,
    pub provider: String,
    pub model: String,
    pub duration_s: Option<f64>,
    pub error: Option<String>,
    pub raw: Value,
}

impl UsageEvent {
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_default()
        };

        Self {
            timestamp: value.get("timestamp").and_then(|ts| {
                ts.as_u64()
                    .or_else(|| ts.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
            }),
            provider: text("provider"),
            model: text("model"),
            duration_s: value.get("duration_s").and_then(Value::as_f64),
            error: value.get("error").and_then(|error| match error {
                Value::Null => None,
                Value::String(message) if message.is_empty() => None,
                Value::String(message) => Some(message.clone()),
                other => Some(other.to_string()),
            }),
            raw: value,
        }
    }

    /// The serialized form the free-text filter searches in.
    #[must_use]
    pub fn search_text(&self) -> String {
        self.raw.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageReport {
    pub summary: UsageSummary,
    pub events: Vec<UsageEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceStatus {
    pub local: LocalInference,
    pub cloud: CloudUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalInference {
    pub online: bool,
    pub models: Vec<LocalModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalModel {
    pub name: String,
    pub size: u64,
    pub family: String,
    pub parameters: String,
    pub remote: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudUsage {
    pub session_usage: Option<f64>,
    pub session_reset: Option<String>,
    pub weekly_usage: Option<f64>,
    pub weekly_reset: Option<String>,
    pub updated_at: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogPost {
    pub title: String,
    pub link: String,
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningNote {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub path: String,
    pub mtime: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub note: String,
    pub raw: Value,
}

impl HistoryEntry {
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let note = match &value {
            Value::String(text) => text.clone(),
            other => ["note", "summary", "title", "message"]
                .iter()
                .find_map(|key| other.get(*key).and_then(Value::as_str))
                .map(str::to_owned)
                .unwrap_or_else(|| other.to_string()),
        };
        Self { note, raw: value }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerStatus {
    pub provider: String,
    pub enabled: bool,
    pub last_run: Option<u64>,
    pub last_error: Option<String>,
    pub latest_cost_usd: Option<f64>,
    pub latest_tokens: Option<f64>,
}

/// One recorded poller cost sample; `timestamp` is unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostPoint {
    pub timestamp: u64,
    pub value: f64,
}

/// Cost series keyed by provider, oldest sample first.
pub type PollerHistory = BTreeMap<String, Vec<CostPoint>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryHit {
    pub line: String,
    pub context: String,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteDocument {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayHealth {
    pub online: bool,
    pub checked_at_ms: u64,
    pub payload: Value,
}

fn default_true() -> bool {
    true
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
