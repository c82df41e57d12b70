//! Capture constraints: which devices to open and how.

use serde::{Deserialize, Serialize};

use crate::MonitorInfo;

/// Device selector inside a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceConstraint {
    /// Any device of the right kind.
    Any,
    /// This device or failure.
    Exact(String),
}

impl DeviceConstraint {
    pub fn exact_id(&self) -> Option<&str> {
        match self {
            DeviceConstraint::Any => None,
            DeviceConstraint::Exact(id) => Some(id),
        }
    }
}

/// Video half of a capture request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConstraints {
    pub device: DeviceConstraint,
    /// Preferred frame width. The platform may deliver something else.
    pub ideal_width: Option<u32>,
    /// Preferred frame height. The platform may deliver something else.
    pub ideal_height: Option<u32>,
}

/// Audio half of a capture request.
///
/// Processing toggles are tri-state: `None` leaves the platform default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConstraints {
    pub device: DeviceConstraint,
    pub echo_cancellation: Option<bool>,
    pub noise_suppression: Option<bool>,
    pub auto_gain_control: Option<bool>,
}

impl AudioConstraints {
    /// True when any processing stage was explicitly requested.
    pub fn wants_processing(&self) -> bool {
        [
            self.echo_cancellation,
            self.noise_suppression,
            self.auto_gain_control,
        ]
        .iter()
        .any(|flag| *flag == Some(true))
    }
}

/// A combined audio+video capture request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub video: VideoConstraints,
    pub audio: AudioConstraints,
}

impl CaptureConstraints {
    /// Request any camera and any microphone with platform defaults.
    /// Used only to trigger the permission prompt.
    pub fn generic() -> Self {
        Self {
            video: VideoConstraints {
                device: DeviceConstraint::Any,
                ideal_width: None,
                ideal_height: None,
            },
            audio: AudioConstraints {
                device: DeviceConstraint::Any,
                echo_cancellation: None,
                noise_suppression: None,
                auto_gain_control: None,
            },
        }
    }

    /// Request an exact camera/microphone pair at the display's pixel size,
    /// with every audio processing stage disabled so the captured signal
    /// stays untouched.
    pub fn raw(video_device_id: &str, audio_device_id: &str, display: &MonitorInfo) -> Self {
        Self {
            video: VideoConstraints {
                device: DeviceConstraint::Exact(video_device_id.to_string()),
                ideal_width: Some(display.width),
                ideal_height: Some(display.height),
            },
            audio: AudioConstraints {
                device: DeviceConstraint::Exact(audio_device_id.to_string()),
                echo_cancellation: Some(false),
                noise_suppression: Some(false),
                auto_gain_control: Some(false),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_constraints_pin_devices_and_disable_processing() {
        let display = MonitorInfo {
            width: 2560,
            height: 1440,
            ..MonitorInfo::default()
        };
        let c = CaptureConstraints::raw("/dev/video2", "hw:1,0", &display);

        assert_eq!(c.video.device.exact_id(), Some("/dev/video2"));
        assert_eq!(c.video.ideal_width, Some(2560));
        assert_eq!(c.video.ideal_height, Some(1440));
        assert_eq!(c.audio.device.exact_id(), Some("hw:1,0"));
        assert_eq!(c.audio.echo_cancellation, Some(false));
        assert_eq!(c.audio.noise_suppression, Some(false));
        assert_eq!(c.audio.auto_gain_control, Some(false));
        assert!(!c.audio.wants_processing());
    }

    #[test]
    fn generic_constraints_leave_everything_to_the_platform() {
        let c = CaptureConstraints::generic();
        assert_eq!(c.video.device, DeviceConstraint::Any);
        assert_eq!(c.audio.device.exact_id(), None);
        assert_eq!(c.video.ideal_width, None);
        assert!(!c.audio.wants_processing());
    }
}
