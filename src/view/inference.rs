use serde::Serialize;

use crate::domain::models::{CloudUsage, InferenceStatus};

use super::format::{format_bytes, format_percent, format_timestamp_s};

const WARN_PERCENT: f64 = 70.0;
const CRITICAL_PERCENT: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeLevel {
    Unknown,
    Ok,
    Warn,
    Critical,
}

impl GaugeLevel {
    #[must_use]
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Unknown => "gauge-unknown",
            Self::Ok => "gauge-ok",
            Self::Warn => "gauge-warn",
            Self::Critical => "gauge-critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageGauge {
    pub label: String,
    pub percent: String,
    pub width_pct: f64,
    pub reset: String,
    pub level: GaugeLevel,
}

impl UsageGauge {
    fn new(label: &str, value: Option<f64>, reset: Option<&str>) -> Self {
        let value = value.filter(|percent| percent.is_finite());
        let level = match value {
            None => GaugeLevel::Unknown,
            Some(percent) if percent >= CRITICAL_PERCENT => GaugeLevel::Critical,
            Some(percent) if percent >= WARN_PERCENT => GaugeLevel::Warn,
            Some(_) => GaugeLevel::Ok,
        };
        Self {
            label: label.to_owned(),
            percent: format_percent(value),
            width_pct: value.unwrap_or(0.0).clamp(0.0, 100.0),
            reset: reset
                .map(str::trim)
                .filter(|reset| !reset.is_empty())
                .map(|reset| format!("resets {reset}"))
                .unwrap_or_default(),
            level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRow {
    pub name: String,
    pub size: String,
    pub detail: String,
    pub remote: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceView {
    pub online: bool,
    pub models: Vec<ModelRow>,
    pub local_count: usize,
    pub remote_count: usize,
    pub session: UsageGauge,
    pub weekly: UsageGauge,
    pub cloud_updated: String,
}

pub fn build_inference_view(status: &InferenceStatus) -> InferenceView {
    let models = status
        .local
        .models
        .iter()
        .map(|model| ModelRow {
            name: model.name.clone(),
            size: if model.remote {
                "remote".to_owned()
            } else {
                format_bytes(model.size)
            },
            detail: [model.family.as_str(), model.parameters.as_str()]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" · "),
            remote: model.remote,
        })
        .collect::<Vec<_>>();
    let remote_count = models.iter().filter(|model| model.remote).count();

    InferenceView {
        online: status.local.online,
        local_count: models.len() - remote_count,
        remote_count,
        models,
        session: cloud_gauge("Session", &status.cloud, true),
        weekly: cloud_gauge("Weekly", &status.cloud, false),
        cloud_updated: status
            .cloud
            .updated_at
            .map(|ts| format!("updated {}", format_timestamp_s(ts)))
            .unwrap_or_default(),
    }
}

fn cloud_gauge(label: &str, cloud: &CloudUsage, session: bool) -> UsageGauge {
    if session {
        UsageGauge::new(label, cloud.session_usage, cloud.session_reset.as_deref())
    } else {
        UsageGauge::new(label, cloud.weekly_usage, cloud.weekly_reset.as_deref())
    }
}
