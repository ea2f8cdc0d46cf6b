//! Human-readable durations ("60s", "5m", "1h", "1d") and `HH:MM` times of day
//! for the config file.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use serde::{de, Deserialize, Deserializer, Serializer};

/// Parse a duration string like "1d", "2h", "30m", "60s".
///
/// The input is case-insensitive and surrounding whitespace is ignored.
///
/// ```
/// use coinboard::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("60s").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_duration(" 2H ").unwrap(), Duration::from_secs(2 * 60 * 60));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_ascii_lowercase();
    let Some(unit) = s.chars().last() else {
        bail!("Duration is empty");
    };

    let multiplier: u64 = match unit {
        'd' => 24 * 60 * 60,
        'h' => 60 * 60,
        'm' => 60,
        's' => 1,
        _ => bail!("Duration must end with d, h, m, or s"),
    };

    let num: u64 = s[..s.len() - 1]
        .trim()
        .parse()
        .with_context(|| format!("Invalid number in duration: {s}"))?;

    let secs = num
        .checked_mul(multiplier)
        .context("Duration is too large")?;
    Ok(Duration::from_secs(secs))
}

/// Format a duration using the largest unit that divides it evenly.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    for (unit, size) in [("d", 24 * 60 * 60), ("h", 60 * 60), ("m", 60)] {
        if secs >= size && secs % size == 0 {
            return format!("{}{unit}", secs / size);
        }
    }
    format!("{secs}s")
}

/// Serde deserializer for duration strings.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

/// Serde deserializer for optional duration strings.
pub fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    s.map(|s| parse_duration(&s).map_err(de::Error::custom))
        .transpose()
}

pub fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(*d))
}

pub fn serialize_duration_opt<S>(d: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match d {
        Some(d) => serializer.serialize_str(&format_duration(*d)),
        None => serializer.serialize_none(),
    }
}

/// Parse a local time of day written as `HH:MM`.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .with_context(|| format!("Invalid time of day (expected HH:MM): {s}"))
}

pub fn deserialize_time_of_day<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_time_of_day(&s).map_err(de::Error::custom)
}

pub fn serialize_time_of_day<S>(t: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&t.format("%H:%M").to_string())
}
