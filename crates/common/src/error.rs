//! Error types shared across Rawcam crates.

use std::fmt;

/// Remediation appended to every discovery failure.
pub const DISCOVERY_REMEDIATION: &str = "Camera and microphone access requires a secure context \
     and a granted capture permission. Grant access to the capture devices and restart Rawcam.";

/// Top-level error type for Rawcam operations.
#[derive(Debug, thiserror::Error)]
pub enum RawcamError {
    #[error("Device discovery failed: {message}. {}", DISCOVERY_REMEDIATION)]
    Discovery { message: String },

    #[error("Could not start capture stream: {message}")]
    StreamAcquisition { message: String },

    #[error("Full-screen request failed: {message}")]
    Fullscreen { message: String },

    #[error("Capture session is busy ({state})")]
    SessionBusy { state: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using RawcamError.
pub type RawcamResult<T> = Result<T, RawcamError>;

/// How the host UI should surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Replaces the selection view until the application is reloaded.
    Persistent,
    /// Blocking notice; the user may retry.
    Transient,
    /// Logged only.
    Logged,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Persistent => f.write_str("persistent"),
            Severity::Transient => f.write_str("transient"),
            Severity::Logged => f.write_str("logged"),
        }
    }
}

impl RawcamError {
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery {
            message: msg.into(),
        }
    }

    pub fn stream_acquisition(msg: impl Into<String>) -> Self {
        Self::StreamAcquisition {
            message: msg.into(),
        }
    }

    pub fn fullscreen(msg: impl Into<String>) -> Self {
        Self::Fullscreen {
            message: msg.into(),
        }
    }

    pub fn busy(state: impl fmt::Display) -> Self {
        Self::SessionBusy {
            state: state.to_string(),
        }
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: msg.into(),
        }
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Convert any failure raised while discovering devices into a
    /// [`RawcamError::Discovery`], keeping the original cause in the message.
    pub fn into_discovery(self) -> Self {
        match self {
            err @ Self::Discovery { .. } => err,
            other => Self::discovery(other.to_string()),
        }
    }

    /// Convert any failure raised while starting a stream into a
    /// [`RawcamError::StreamAcquisition`].
    pub fn into_stream_acquisition(self) -> Self {
        match self {
            err @ (Self::StreamAcquisition { .. } | Self::SessionBusy { .. }) => err,
            other => Self::stream_acquisition(other.to_string()),
        }
    }

    /// Convert any full-screen primitive failure into a [`RawcamError::Fullscreen`].
    pub fn into_fullscreen(self) -> Self {
        match self {
            err @ Self::Fullscreen { .. } => err,
            other => Self::fullscreen(other.to_string()),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Discovery { .. } => Severity::Persistent,
            Self::Fullscreen { .. } => Severity::Logged,
            _ => Severity::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_message_explains_remediation() {
        let err = RawcamError::permission_denied("/dev/video0 is not readable").into_discovery();
        let text = err.to_string();
        assert!(text.starts_with("Device discovery failed: Permission denied"));
        assert!(text.contains("secure context"));
        assert!(text.contains("permission"));
        assert_eq!(err.severity(), Severity::Persistent);
    }

    #[test]
    fn boundary_conversions_keep_user_facing_kinds() {
        let busy = RawcamError::busy("starting").into_stream_acquisition();
        assert!(matches!(busy, RawcamError::SessionBusy { .. }));

        let platform = RawcamError::platform("v4l2src failed").into_stream_acquisition();
        assert!(matches!(platform, RawcamError::StreamAcquisition { .. }));
        assert_eq!(platform.severity(), Severity::Transient);

        let fs = RawcamError::unsupported("no fullscreen property").into_fullscreen();
        assert!(matches!(fs, RawcamError::Fullscreen { .. }));
        assert_eq!(fs.severity(), Severity::Logged);
    }
}
