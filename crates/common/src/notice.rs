//! Error text delivered to the host UI.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{RawcamError, Severity};

/// A user-visible message derived from an error.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub at: DateTime<Utc>,
    pub persistent: bool,
    pub text: String,
}

impl Notice {
    /// Build a notice for an error that must reach the user.
    ///
    /// Returns `None` for errors that are only logged.
    pub fn from_error(err: &RawcamError) -> Option<Self> {
        let persistent = match err.severity() {
            Severity::Persistent => true,
            Severity::Transient => false,
            Severity::Logged => return None,
        };
        Some(Self {
            at: Utc::now(),
            persistent,
            text: err.to_string(),
        })
    }

    pub fn transient(text: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            persistent: false,
            text: text.into(),
        }
    }
}
