use std::time::Duration;

use humantime::parse_duration;

use crate::error::ConfigError;

pub(super) fn env_string(key: &'static str) -> std::result::Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(ConfigError::Other(format!("{key}: {err}"))),
    }
}

pub(super) fn env_bool(key: &'static str) -> std::result::Result<Option<bool>, ConfigError> {
    let Some(value) = env_string(key)? else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "y" => Ok(Some(true)),
        "0" | "false" | "no" | "n" => Ok(Some(false)),
        other => Err(ConfigError::InvalidField {
            field: key,
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}

pub(super) fn env_duration(
    key: &'static str,
) -> std::result::Result<Option<Duration>, ConfigError> {
    if let Some(value) = env_string(key)? {
        if value.trim().is_empty() {
            return Ok(None);
        }
        return parse_duration(value.trim())
            .map(Some)
            .map_err(|err| ConfigError::InvalidField {
                field: key,
                message: err.to_string(),
            });
    }
    Ok(None)
}
