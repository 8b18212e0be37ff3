//! Safe bindings to libnotify, the desktop notification client library.
//!
//! [`Notifier`] wraps the process-wide library state (init, application name,
//! server discovery) and creates [`Notification`] handles. No raw native
//! pointer, list or error type crosses this crate's public API.
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod action;
pub mod config;
pub mod error;
pub mod hint;
mod marshal;
mod notification;
mod session;
mod sys;
pub mod telemetry;
pub mod types;

pub use action::RegistrationId;
pub use error::{Error, NativeError};
pub use hint::HintValue;
pub use notification::Notification;
pub use session::Notifier;
pub use types::{ClosedReason, ServerInfo, Timeout, Urgency};

pub type Result<T> = std::result::Result<T, error::Error>;
