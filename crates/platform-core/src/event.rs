//! Display-side notifications delivered to the capture engine.

use serde::{Deserialize, Serialize};

/// An event raised by the display host or the active stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayEvent {
    /// The display sink has attached `stream_id` and rendered it.
    SinkMounted { stream_id: String },
    /// Process-wide full-screen state changed. `fullscreen == false` means no
    /// element is full-screen any more, whoever caused the exit.
    FullscreenChanged { fullscreen: bool },
    /// The sink reported that playback was paused.
    MediaPaused,
    /// A capture device vanished (unplugged or revoked).
    DeviceLost { device_id: String },
}

/// Options passed with a full-screen request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullscreenOptions {
    /// Hide navigation affordances (title bar, panels, cursor).
    pub hide_navigation: bool,
}

impl Default for FullscreenOptions {
    fn default() -> Self {
        Self {
            hide_navigation: true,
        }
    }
}
