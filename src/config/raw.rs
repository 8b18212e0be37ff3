use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;

use crate::Result;
use crate::error::ConfigError;
use crate::hint::HintValue;
use crate::types::Urgency;

use super::defaults::{default_app_name, default_library, default_urgency};
use super::env::{env_bool, env_duration, env_string};
use super::{Config, HumantimeDuration, MAX_TIMEOUT, NotifySettings};

pub(super) fn load(path: impl AsRef<Path>) -> std::result::Result<RawConfig, ConfigError> {
    let mut builder = ::config::Config::builder();
    let path = path.as_ref();
    builder = builder.add_source(::config::File::from(path).required(false));
    builder = builder.add_source(
        ::config::Environment::with_prefix("GNOTIFY")
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .map_err(|err| ConfigError::Other(err.to_string()))?
        .try_deserialize()
        .map_err(|err| ConfigError::Parse(err.to_string()))
}

#[derive(Debug, Deserialize)]
pub(super) struct RawConfig {
    #[serde(default = "default_library")]
    pub(super) library: PathBuf,
    #[serde(default)]
    pub(super) notify: RawNotify,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(super) struct RawNotify {
    #[serde(default = "default_app_name")]
    pub(super) app_name: String,
    #[serde(default)]
    pub(super) sticky: bool,
    #[serde(default)]
    #[serde_as(as = "Option<HumantimeDuration>")]
    pub(super) timeout: Option<Duration>,
    #[serde(default = "default_urgency")]
    pub(super) urgency: String,
    #[serde(default)]
    pub(super) category: Option<String>,
    #[serde(default)]
    pub(super) icon: Option<PathBuf>,
    #[serde(default)]
    pub(super) hints: BTreeMap<String, String>,
}

impl RawConfig {
    pub(super) fn apply_env_overrides(&mut self) -> std::result::Result<(), ConfigError> {
        if let Some(library) = env_string("NOTIFY_LIBRARY")? {
            self.library = PathBuf::from(library);
        }
        if let Some(app_name) = env_string("NOTIFY_APPNAME")? {
            self.notify.app_name = app_name;
        }
        if let Some(sticky) = env_bool("NOTIFY_STICKY")? {
            self.notify.sticky = sticky;
        }
        if let Some(timeout) = env_duration("NOTIFY_TIMEOUT")? {
            self.notify.timeout = Some(timeout);
        }
        if let Some(urgency) = env_string("NOTIFY_URGENCY")? {
            self.notify.urgency = urgency;
        }
        if let Some(category) = env_string("NOTIFY_CATEGORY")? {
            self.notify.category = Some(category);
        }
        if let Some(icon) = env_string("NOTIFY_ICON")? {
            self.notify.icon = Some(PathBuf::from(icon));
        }
        Ok(())
    }

    pub(super) fn validate_and_build(self) -> Result<Config> {
        if self.library.as_os_str().is_empty() {
            return Err(ConfigError::MissingField { field: "library" }.into());
        }

        let app_name = self.notify.app_name.trim().to_string();
        if app_name.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "notify.app_name",
                message: "application name cannot be empty".to_string(),
            }
            .into());
        }

        if let Some(timeout) = self.notify.timeout {
            if timeout > MAX_TIMEOUT {
                return Err(ConfigError::InvalidField {
                    field: "notify.timeout",
                    message: format!(
                        "expected at most {}ms, got {}ms",
                        MAX_TIMEOUT.as_millis(),
                        timeout.as_millis()
                    ),
                }
                .into());
            }
        }

        let urgency = Urgency::from_str(self.notify.urgency.trim()).map_err(|err| {
            ConfigError::InvalidField {
                field: "notify.urgency",
                message: err,
            }
        })?;

        let mut hints = BTreeMap::new();
        for (key, raw) in self.notify.hints {
            let value = HintValue::from_str(&raw).map_err(|err| ConfigError::InvalidField {
                field: "notify.hints",
                message: format!("{key}: {err}"),
            })?;
            if !value.is_supported() {
                return Err(ConfigError::InvalidField {
                    field: "notify.hints",
                    message: format!("{key}: unsupported hint kind {:?}", value.kind()),
                }
                .into());
            }
            hints.insert(key, value);
        }

        Ok(Config {
            library: self.library,
            notify: NotifySettings {
                app_name,
                sticky: self.notify.sticky,
                timeout: self.notify.timeout,
                urgency,
                category: self.notify.category.filter(|c| !c.trim().is_empty()),
                icon: self.notify.icon,
                hints,
            },
        })
    }
}

impl Default for RawNotify {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            sticky: false,
            timeout: None,
            urgency: default_urgency(),
            category: None,
            icon: None,
            hints: BTreeMap::new(),
        }
    }
}
