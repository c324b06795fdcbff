//! Duration parsing for configuration files.
//!
//! Durations are written in humantime form: `500ms`, `2s`, `1m 30s`.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Parse a humantime duration string.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim())
        .map_err(|e| format!("invalid duration '{s}': expected humantime (e.g. 500ms, 2s): {e}"))
}

/// Deserialize a duration from a string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

/// Serialize a duration in humantime form.
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}
