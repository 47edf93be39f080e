use chrono::{DateTime, Local};

const SECOND_MS: u64 = 1_000;
const MINUTE_MS: u64 = 60 * SECOND_MS;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

pub fn format_relative(now_ms: u64, then_ms: u64) -> String {
    let elapsed = now_ms.saturating_sub(then_ms);
    if elapsed < MINUTE_MS {
        "just now".to_owned()
    } else if elapsed < HOUR_MS {
        format!("{}m ago", elapsed / MINUTE_MS)
    } else if elapsed < DAY_MS {
        format!("{}h ago", elapsed / HOUR_MS)
    } else {
        format!("{}d ago", elapsed / DAY_MS)
    }
}

pub fn format_until(now_ms: u64, at_ms: u64) -> String {
    if at_ms <= now_ms {
        return "due now".to_owned();
    }
    let remaining = at_ms - now_ms;
    if remaining < MINUTE_MS {
        format!("in {}s", remaining.div_ceil(SECOND_MS))
    } else if remaining < HOUR_MS {
        format!("in {}m", remaining / MINUTE_MS)
    } else if remaining < DAY_MS {
        let minutes = (remaining % HOUR_MS) / MINUTE_MS;
        if minutes == 0 {
            format!("in {}h", remaining / HOUR_MS)
        } else {
            format!("in {}h {}m", remaining / HOUR_MS, minutes)
        }
    } else {
        format!("in {}d", remaining / DAY_MS)
    }
}

pub fn format_interval(every_ms: u64) -> String {
    let (value, unit) = if every_ms >= DAY_MS && every_ms.is_multiple_of(DAY_MS) {
        (every_ms / DAY_MS, "d")
    } else if every_ms >= HOUR_MS && every_ms.is_multiple_of(HOUR_MS) {
        (every_ms / HOUR_MS, "h")
    } else if every_ms >= MINUTE_MS && every_ms.is_multiple_of(MINUTE_MS) {
        (every_ms / MINUTE_MS, "m")
    } else if every_ms >= SECOND_MS && every_ms.is_multiple_of(SECOND_MS) {
        (every_ms / SECOND_MS, "s")
    } else {
        (every_ms, "ms")
    };
    format!("every {value}{unit}")
}

/// Binary units, one decimal above bytes.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

pub fn format_tokens(tokens: u64) -> String {
    if tokens < 1_000 {
        tokens.to_string()
    } else if tokens < 1_000_000 {
        format!("{:.1}k", tokens as f64 / 1_000.0)
    } else {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(percent) if percent.is_finite() => format!("{percent:.0}%"),
        _ => "—".to_owned(),
    }
}

pub fn format_duration_s(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1_000.0)
    } else {
        format!("{seconds:.1}s")
    }
}

pub fn format_cost(usd: Option<f64>) -> String {
    match usd {
        Some(value) if value.is_finite() => format!("${value:.2}"),
        _ => "—".to_owned(),
    }
}

/// Local wall-clock rendering of a unix millisecond timestamp.
pub fn format_timestamp_ms(ms: u64) -> String {
    let Some(utc) = DateTime::from_timestamp_millis(i64::try_from(ms).unwrap_or(i64::MAX)) else {
        return "—".to_owned();
    };
    utc.with_timezone(&Local).format("%b %d %H:%M").to_string()
}

pub fn format_timestamp_s(seconds: u64) -> String {
    format_timestamp_ms(seconds.saturating_mul(1_000))
}

/// Collapses whitespace and cuts to `max_chars`, marking the cut with an ellipsis.
pub fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut cut = collapsed
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    cut.push('…');
    cut
}
