use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::DashboardError;

pub const KEY_HASHNODE_API_KEY: &str = "hashnode_api_key";
pub const KEY_HASHNODE_URL: &str = "hashnode_url";
pub const KEY_PUBLICATION_ID: &str = "publication_id";
pub const KEY_SCHEDULE_HOUR: &str = "scheduleHour";
pub const KEY_NOTES_PATH: &str = "notes_path";
pub const KEY_RSS_FEEDS: &str = "rss_feeds";
pub const KEY_PROVIDER_CONFIG: &str = "provider_config";

/// Settings document as stored by the proxy. Kept as a raw object so keys this
/// crate does not know about survive a load/save cycle untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(Map<String, Value>);

impl Settings {
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_owned(), value);
    }

    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn schedule_hour(&self) -> Option<u8> {
        let value = self.0.get(KEY_SCHEDULE_HOUR)?;
        let hour = value
            .as_u64()
            .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))?;
        u8::try_from(hour).ok().filter(|hour| *hour <= 23)
    }

    #[must_use]
    pub fn rss_feeds(&self) -> Vec<String> {
        self.0
            .get(KEY_RSS_FEEDS)
            .and_then(Value::as_array)
            .map(|feeds| {
                feeds
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn provider_config(&self) -> Option<&Value> {
        self.0.get(KEY_PROVIDER_CONFIG).filter(|value| !value.is_null())
    }
}

/// Raw form fields of the settings editor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsDraft {
    pub hashnode_api_key: String,
    pub hashnode_url: String,
    pub publication_id: String,
    pub schedule_hour: String,
    pub notes_path: String,
    pub rss_feeds: String,
    pub provider_config: String,
}

impl SettingsDraft {
    /// Prefills the editor from a loaded document.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let text = |key: &str| settings.text(key).unwrap_or_default().to_owned();
        Self {
            hashnode_api_key: text(KEY_HASHNODE_API_KEY),
            hashnode_url: text(KEY_HASHNODE_URL),
            publication_id: text(KEY_PUBLICATION_ID),
            schedule_hour: settings
                .schedule_hour()
                .map(|hour| hour.to_string())
                .unwrap_or_default(),
            notes_path: text(KEY_NOTES_PATH),
            rss_feeds: settings.rss_feeds().join("\n"),
            provider_config: settings
                .provider_config()
                .and_then(|config| serde_json::to_string_pretty(config).ok())
                .unwrap_or_default(),
        }
    }

    /// Merges the draft over `base`. Fields the viewer left as they were loaded keep
    /// their stored value verbatim. Fails without side effects when the hour is out of
    /// range or the provider config is not parseable JSON.
    pub fn apply_to(&self, base: &Settings) -> Result<Settings, DashboardError> {
        let loaded = Self::from_settings(base);
        let provider_config = parse_provider_config(&self.provider_config)?;
        let schedule_hour = parse_schedule_hour(&self.schedule_hour)?;

        let mut next = base.clone();
        for (key, edited, original) in [
            (KEY_HASHNODE_API_KEY, &self.hashnode_api_key, &loaded.hashnode_api_key),
            (KEY_HASHNODE_URL, &self.hashnode_url, &loaded.hashnode_url),
            (KEY_PUBLICATION_ID, &self.publication_id, &loaded.publication_id),
            (KEY_NOTES_PATH, &self.notes_path, &loaded.notes_path),
        ] {
            if edited != original {
                next.set(key, optional_text(edited));
            }
        }
        if self.schedule_hour != loaded.schedule_hour
            && let Some(hour) = schedule_hour
        {
            next.set(KEY_SCHEDULE_HOUR, Value::from(hour));
        }
        if self.rss_feeds != loaded.rss_feeds {
            next.set(
                KEY_RSS_FEEDS,
                Value::Array(
                    self.rss_feeds
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(|line| Value::String(line.to_owned()))
                        .collect(),
                ),
            );
        }
        if self.provider_config != loaded.provider_config {
            next.set(KEY_PROVIDER_CONFIG, provider_config);
        }
        Ok(next)
    }
}

fn optional_text(input: &str) -> Value {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::String(trimmed.to_owned())
    }
}

fn parse_schedule_hour(input: &str) -> Result<Option<u8>, DashboardError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<u8>() {
        Ok(hour) if hour <= 23 => Ok(Some(hour)),
        _ => Err(DashboardError::Validation(
            "schedule hour must be between 0 and 23".to_owned(),
        )),
    }
}

pub fn parse_provider_config(input: &str) -> Result<Value, DashboardError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(trimmed).map_err(|error| {
        DashboardError::Validation(format!("provider config is not valid JSON: {error}"))
    })
}
