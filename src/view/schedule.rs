use std::fmt;

use chrono::{DateTime, Days, NaiveTime, TimeDelta, TimeZone};
use serde::Serialize;

use crate::domain::models::{CronJob, CronSchedule};

use super::format::{format_interval, format_until};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    #[must_use]
    pub fn from_delta(delta: TimeDelta) -> Self {
        let total = delta.num_seconds().max(0);
        Self {
            hours: total / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
        }
    }

    #[must_use]
    pub fn total_seconds(&self) -> i64 {
        self.hours * 3_600 + self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Next instant at `hour`:00:00 wall-clock time in `now`'s zone that is not before
/// `now`. An ambiguous wall-clock time resolves to its earlier instant; a skipped one
/// moves to the following day.
#[must_use]
pub fn next_occurrence<Tz: TimeZone>(now: &DateTime<Tz>, hour: u8) -> DateTime<Tz> {
    let target_time =
        NaiveTime::from_hms_opt(u32::from(hour.min(23)), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive();
    (0..=2)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter_map(|date| {
            now.timezone()
                .from_local_datetime(&date.and_time(target_time))
                .earliest()
        })
        .find(|candidate| candidate >= now)
        .unwrap_or_else(|| now.clone() + TimeDelta::days(1))
}

#[must_use]
pub fn countdown_to<Tz: TimeZone>(now: &DateTime<Tz>, hour: u8) -> Countdown {
    Countdown::from_delta(next_occurrence(now, hour).signed_duration_since(now))
}

pub fn schedule_label(schedule: &CronSchedule) -> String {
    let expr = schedule
        .expr
        .as_deref()
        .map(str::trim)
        .filter(|expr| !expr.is_empty());
    let mut label = match (schedule.kind.as_str(), expr, schedule.every_ms, &schedule.at) {
        ("every", _, Some(every_ms), _) => format_interval(every_ms),
        ("at", _, _, Some(at)) => format!("once at {at}"),
        (_, Some(expr), _, _) => format!("cron {expr}"),
        (_, None, Some(every_ms), _) => format_interval(every_ms),
        _ => "unscheduled".to_owned(),
    };
    if let Some(tz) = schedule.tz.as_deref().filter(|tz| !tz.is_empty()) {
        label.push_str(&format!(" ({tz})"));
    }
    label
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CronRow {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub schedule: String,
    pub next_run: String,
    pub last_status: Option<String>,
}

/// Soonest first; jobs without a next run go last.
pub fn build_cron_rows(jobs: &[CronJob], now_ms: u64) -> Vec<CronRow> {
    let mut ordered = jobs.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|job| (job.state.next_run_at_ms.is_none(), job.state.next_run_at_ms));

    ordered
        .into_iter()
        .map(|job| CronRow {
            id: job.id.clone(),
            name: if job.name.trim().is_empty() {
                job.id.clone()
            } else {
                job.name.clone()
            },
            enabled: job.enabled,
            schedule: schedule_label(&job.schedule),
            next_run: match (job.enabled, job.state.next_run_at_ms) {
                (false, _) => "disabled".to_owned(),
                (true, Some(next)) => format_until(now_ms, next),
                (true, None) => "—".to_owned(),
            },
            last_status: job.state.last_status.clone(),
        })
        .collect()
}
