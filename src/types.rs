use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    Critical,
}

impl Urgency {
    /// `NotifyUrgency` value understood by the native library.
    #[must_use]
    pub const fn as_native(self) -> i32 {
        match self {
            Self::Low => 0,
            Self::Normal => 1,
            Self::Critical => 2,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::Critical => "critical",
        }
    }
}

impl Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" | "0" => Ok(Self::Low),
            "normal" | "1" => Ok(Self::Normal),
            "critical" | "2" => Ok(Self::Critical),
            other => Err(format!("unknown urgency: {other}")),
        }
    }
}

/// Expiration of a notification, interpreted by the notification server.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Timeout {
    /// Server default (`NOTIFY_EXPIRES_DEFAULT`).
    #[default]
    Default,
    /// Stays until dismissed (`NOTIFY_EXPIRES_NEVER`).
    Never,
    /// Expires after the given delay. The native value 0 means never, so a
    /// zero delay is sent as the shortest expiry the server accepts.
    Milliseconds(u32),
}

impl Timeout {
    #[must_use]
    pub fn as_native(self) -> i32 {
        match self {
            Self::Default => -1,
            Self::Never => 0,
            Self::Milliseconds(ms) => i32::try_from(ms.max(1)).unwrap_or(i32::MAX),
        }
    }

    /// Resolves the configured timeout: sticky wins over an explicit duration,
    /// which wins over the server default.
    #[must_use]
    pub fn resolve(sticky: bool, timeout: Option<Duration>) -> Self {
        if sticky {
            Self::Never
        } else if let Some(duration) = timeout {
            Self::from(duration)
        } else {
            Self::Default
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Self::Milliseconds(u32::try_from(duration.as_millis()).unwrap_or(u32::MAX).max(1))
    }
}

/// Why the server closed a notification, as recorded by the native library.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClosedReason {
    /// No close signal has been received yet.
    NotClosed,
    Expired,
    Dismissed,
    ClosedByCall,
    Undefined,
    Other(i32),
}

impl From<i32> for ClosedReason {
    fn from(code: i32) -> Self {
        match code {
            -1 => Self::NotClosed,
            1 => Self::Expired,
            2 => Self::Dismissed,
            3 => Self::ClosedByCall,
            4 => Self::Undefined,
            other => Self::Other(other),
        }
    }
}

impl ClosedReason {
    #[must_use]
    pub const fn is_closed(self) -> bool {
        !matches!(self, Self::NotClosed)
    }
}

/// Identity of the notification server, each field copied out of native memory.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub spec_version: String,
}
