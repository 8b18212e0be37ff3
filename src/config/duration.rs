use std::time::Duration;

use humantime::parse_duration;
use serde::Deserialize;
use serde_with::DeserializeAs;

/// Reads durations written the human way (`"5s"`, `"1m 30s"`).
pub(super) struct HumantimeDuration;

impl<'de> DeserializeAs<'de, Duration> for HumantimeDuration {
    fn deserialize_as<D>(deserializer: D) -> std::result::Result<Duration, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}
