use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load native library {}", library.display())]
    Load {
        library: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("native library does not export `{name}`")]
    Symbol {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },
    #[error("notification library could not be initialised for {app_name:?}")]
    Init { app_name: String },
    #[error("native library could not create the notification")]
    Construction,
    #[error(transparent)]
    Native(#[from] NativeError),
    #[error("native library rejected `{operation}` without error detail")]
    Rejected { operation: &'static str },
    #[error("{field} contains a NUL byte at offset {position}")]
    InteriorNul { field: &'static str, position: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

/// Failure detail reported by the native library through its `GError`
/// out-parameter, copied into host memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    pub domain: u32,
    pub domain_name: Option<String>,
    pub code: i32,
    pub message: String,
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.domain_name {
            Some(name) => write!(f, "{} ({name}, code {})", self.message, self.code),
            None => write!(
                f,
                "{} (domain {}, code {})",
                self.message, self.domain, self.code
            ),
        }
    }
}

impl std::error::Error for NativeError {}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("missing required configuration field: {field}")]
    MissingField { field: &'static str },
    #[error("invalid configuration for {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("configuration error: {0}")]
    Other(String),
}

impl Error {
    /// Native failure detail, when the error came from the native library.
    #[must_use]
    pub const fn native(&self) -> Option<&NativeError> {
        match self {
            Self::Native(err) => Some(err),
            _ => None,
        }
    }
}
