use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::OnceLock;

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\s*([a-zA-Z]*)$").expect("static duration pattern"))
}

/// Parses ban durations as the backend stores them: "permanent", bare minutes
/// ("1440"), or a number with a unit ("30m", "12h", "7d", "1mo", "1y").
///
/// `Some(Duration::zero())` means permanent. Seconds are not a unit: a
/// sub-minute ban would round down to permanent. "Until ...", out of range
/// values and anything else unrecognised yield `None`.
pub fn parse_duration(duration_str: &str) -> Option<Duration> {
    let duration_str = duration_str.trim();
    if duration_str.eq_ignore_ascii_case("permanent") {
        return Some(Duration::zero());
    }

    let caps = duration_regex().captures(duration_str)?;
    let value: i64 = caps[1].parse().ok()?;
    let unit = caps[2].to_ascii_lowercase();

    match unit.as_str() {
        "" | "m" | "min" => Duration::try_minutes(value),
        "h" => Duration::try_hours(value),
        "d" => Duration::try_days(value),
        "w" => Duration::try_weeks(value),
        "mo" => value.checked_mul(30).and_then(Duration::try_days), // Approx
        "y" => value.checked_mul(365).and_then(Duration::try_days), // Approx
        _ => None,
    }
}

pub fn parse_duration_minutes(duration_str: &str) -> Option<i64> {
    parse_duration(duration_str).map(|d| d.num_minutes())
}

/// Ban durations arrive either as a JSON number of minutes or as text.
pub fn deserialize_minutes<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Minutes(i64),
        Text(String),
        Missing(Option<()>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Minutes(m) => m,
        Raw::Text(s) => parse_duration_minutes(&s).unwrap_or(0),
        Raw::Missing(_) => 0,
    })
}

/// Human readable length, "Permanent" for zero.
pub fn format_minutes(minutes: i64) -> String {
    if minutes <= 0 {
        return "Permanent".to_string();
    }
    let days = minutes / (24 * 60);
    let hours = (minutes % (24 * 60)) / 60;
    let mins = minutes % 60;
    match (days, hours, mins) {
        (d, 0, 0) => format!("{d}d"),
        (0, h, 0) => format!("{h}h"),
        (0, 0, m) => format!("{m}m"),
        (0, h, m) => format!("{h}h {m}m"),
        (d, h, _) => format!("{d}d {h}h"),
    }
}

pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
