use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::models::{CostPoint, UsageEvent, UsageSummary};

pub const CHART_MAX_HEIGHT_PX: u32 = 120;
pub const CHART_MIN_HEIGHT_PX: u32 = 4;
pub const EVENT_DISPLAY_LIMIT: usize = 100;
pub const ALL_PROVIDERS: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelTotal {
    pub model: String,
    pub requests: u64,
    pub last: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderTotal {
    pub provider: String,
    pub requests: u64,
    pub models: Vec<ModelTotal>,
}

/// Per-provider request totals, by provider name. `hidden` drops one provider,
/// used for the gateway's own internal traffic.
pub fn provider_totals(summary: &UsageSummary, hidden: Option<&str>) -> Vec<ProviderTotal> {
    summary
        .providers
        .iter()
        .filter(|(provider, _)| hidden != Some(provider.as_str()))
        .map(|(provider, usage)| {
            let models = usage
                .models
                .iter()
                .map(|(model, entry)| ModelTotal {
                    model: model.clone(),
                    requests: entry.requests,
                    last: entry.last,
                })
                .collect::<Vec<_>>();
            ProviderTotal {
                provider: provider.clone(),
                requests: models.iter().map(|model| model.requests).sum(),
                models,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBar {
    pub label: String,
    pub value: u64,
    pub height_px: u32,
}

/// Maps values onto bar heights: the largest becomes [`CHART_MAX_HEIGHT_PX`] and
/// nothing drops below [`CHART_MIN_HEIGHT_PX`].
pub fn scale_heights(values: &[f64]) -> Vec<u32> {
    let max = values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold(0.0_f64, f64::max);

    values
        .iter()
        .map(|value| {
            let scaled = if max <= 0.0 || !value.is_finite() {
                0
            } else {
                ((value.max(0.0) / max) * f64::from(CHART_MAX_HEIGHT_PX)).round() as u32
            };
            scaled.clamp(CHART_MIN_HEIGHT_PX, CHART_MAX_HEIGHT_PX)
        })
        .collect()
}

pub fn scale_bars(totals: &[ProviderTotal]) -> Vec<ChartBar> {
    let values = totals
        .iter()
        .map(|total| total.requests as f64)
        .collect::<Vec<_>>();

    totals
        .iter()
        .zip(scale_heights(&values))
        .map(|(total, height_px)| ChartBar {
            label: total.provider.clone(),
            value: total.requests,
            height_px,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBar {
    pub timestamp: u64,
    pub cost_usd: f64,
    pub height_px: u32,
}

/// A poller's cost history as bars, oldest first.
pub fn cost_bars(points: &[CostPoint]) -> Vec<CostBar> {
    let values = points.iter().map(|point| point.value).collect::<Vec<_>>();
    points
        .iter()
        .zip(scale_heights(&values))
        .map(|(point, height_px)| CostBar {
            timestamp: point.timestamp,
            cost_usd: point.value,
            height_px,
        })
        .collect()
}

/// Two independent predicates; an event must pass both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventFilter {
    pub provider: Option<String>,
    pub search: Option<String>,
}

impl EventFilter {
    #[must_use]
    pub fn new(provider: &str, search: &str) -> Self {
        let provider = provider.trim();
        let search = search.trim();
        Self {
            provider: (!provider.is_empty() && provider != ALL_PROVIDERS)
                .then(|| provider.to_owned()),
            search: (!search.is_empty()).then(|| search.to_lowercase()),
        }
    }

    #[must_use]
    pub fn matches(&self, event: &UsageEvent) -> bool {
        if let Some(provider) = &self.provider {
            if event.provider != *provider {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !event.search_text().to_lowercase().contains(search.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Filtered events, newest first, at most [`EVENT_DISPLAY_LIMIT`].
pub fn visible_events<'a>(events: &'a [UsageEvent], filter: &EventFilter) -> Vec<&'a UsageEvent> {
    let mut visible = events
        .iter()
        .enumerate()
        .filter(|(_, event)| filter.matches(event))
        .collect::<Vec<_>>();
    // Untimed raw lines keep their log position relative to each other.
    visible.sort_by(|(left_index, left), (right_index, right)| {
        right
            .timestamp
            .cmp(&left.timestamp)
            .then(right_index.cmp(left_index))
    });
    visible
        .into_iter()
        .take(EVENT_DISPLAY_LIMIT)
        .map(|(_, event)| event)
        .collect()
}

/// Provider names present in the loaded events, for the filter picker.
pub fn event_providers(events: &[UsageEvent]) -> Vec<String> {
    events
        .iter()
        .map(|event| event.provider.as_str())
        .filter(|provider| !provider.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}
