use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Result;
use crate::error::Error as NotifyError;
use crate::hint::HintValue;
use crate::types::{Timeout, Urgency};

mod defaults;
mod duration;
mod env;
mod raw;

use duration::HumantimeDuration;

/// Longest timeout the native library can represent, in milliseconds.
const MAX_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

#[derive(Debug, Clone)]
pub struct Config {
    /// Path or soname handed to the dynamic linker.
    pub library: PathBuf,
    pub notify: NotifySettings,
}

/// Defaults applied to every notification the CLI sends.
#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub app_name: String,
    pub sticky: bool,
    pub timeout: Option<Duration>,
    pub urgency: Urgency,
    pub category: Option<String>,
    pub icon: Option<PathBuf>,
    pub hints: BTreeMap<String, HintValue>,
}

impl Config {
    /// Load configuration from a file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration file cannot be parsed, when
    /// environment overrides are invalid, or when the resulting values fail
    /// validation.
    pub fn from_env_and_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut raw = raw::load(path).map_err(NotifyError::from)?;
        raw.apply_env_overrides().map_err(NotifyError::from)?;
        raw.validate_and_build()
    }
}

impl NotifySettings {
    #[must_use]
    pub fn timeout(&self) -> Timeout {
        Timeout::resolve(self.sticky, self.timeout)
    }
}
