//! Deadline parsing and "time remaining" helpers.
//!
//! Deadlines arrive as free-form ISO-like strings. Anything without an
//! explicit offset is read as wall-clock time in the canonical UTC+8 zone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Offset applied to timestamps that carry no zone information.
pub const CANONICAL_OFFSET_SECS: i32 = 8 * 3600;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub fn canonical_offset() -> Option<FixedOffset> {
    FixedOffset::east_opt(CANONICAL_OFFSET_SECS)
}

/// Resolves a raw deadline into an absolute instant, or `None` when it is
/// empty or unparseable.
pub fn resolve(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.contains('Z') {
        return parse_with_offset(&raw.replace('Z', "+00:00"));
    }

    if has_explicit_offset(raw) {
        if let Some(instant) = parse_with_offset(raw) {
            return Some(instant);
        }
    }

    let offset = canonical_offset()?;
    parse_naive(raw)
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
}

/// A `+` anywhere, or a `-` in the time portion after `T`, marks an offset.
fn has_explicit_offset(raw: &str) -> bool {
    raw.contains('+')
        || raw
            .split_once('T')
            .map(|(_, time)| time.contains('-'))
            .unwrap_or(false)
}

fn parse_with_offset(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Human readable time left until the deadline, relative to `now`.
pub fn remaining_label(raw: &str, now: DateTime<Utc>) -> String {
    let Some(deadline) = resolve(raw) else {
        return "unknown".to_string();
    };
    if deadline < now {
        return "expired".to_string();
    }

    let diff = deadline - now;
    let days = diff.num_days();
    let hours = (diff.num_seconds() % 86_400) / 3_600;
    if days >= 1 {
        format!("{days} days {hours} hours remaining")
    } else {
        format!("{hours} hours remaining")
    }
}

/// Epoch seconds of the resolved deadline; unresolvable deadlines sort last.
pub fn sort_key(raw: &str) -> f64 {
    resolve(raw)
        .map(|dt| dt.timestamp_millis() as f64 / 1000.0)
        .unwrap_or(f64::INFINITY)
}
