use std::path::PathBuf;

use crate::Notifier;

pub(super) fn default_library() -> PathBuf {
    PathBuf::from(Notifier::DEFAULT_LIBRARY)
}

pub(super) fn default_app_name() -> String {
    "gnotify".to_string()
}

pub(super) fn default_urgency() -> String {
    "normal".to_string()
}
