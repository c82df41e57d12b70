//! Rawcam platform core contracts.
//!
//! This crate contains cross-platform device, constraint, and display data
//! structures used by the capture engine without coupling to a concrete OS
//! backend.

use serde::{Deserialize, Serialize};

pub mod constraints;
pub mod device;
pub mod event;

pub use constraints::*;
pub use device::*;
pub use event::*;

/// Information about a connected monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorInfo {
    /// Monitor name/identifier.
    pub name: String,
    /// Resolution in physical pixels.
    pub width: u32,
    pub height: u32,
    /// Position in the virtual desktop (pixels).
    pub x: i32,
    pub y: i32,
    /// Scale factor (for example 1.0, 1.25, 2.0).
    pub scale_factor: f64,
    /// Whether this monitor is primary.
    pub primary: bool,
}

impl Default for MonitorInfo {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            width: 1920,
            height: 1080,
            x: 0,
            y: 0,
            scale_factor: 1.0,
            primary: true,
        }
    }
}

/// Display server / platform family hosting the preview window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayServer {
    Wayland,
    X11,
    #[default]
    Unknown,
}

/// Pick the monitor that hosts full-screen output: the primary one, else the
/// first, else a 1920x1080 default.
pub fn primary_monitor(monitors: &[MonitorInfo]) -> MonitorInfo {
    monitors
        .iter()
        .find(|m| m.primary)
        .or_else(|| monitors.first())
        .cloned()
        .unwrap_or_default()
}
