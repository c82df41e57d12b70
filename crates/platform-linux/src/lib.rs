//! Rawcam Linux Platform Integration
//!
//! Platform-specific implementations for Linux:
//! - **Devices:** V4L2 and ALSA capture devices grouped by USB parent (sysfs)
//! - **Display Detection:** connected DRM outputs and display server
//! - **Camera Portal:** consent negotiation for sandboxed builds
//! - **Permissions:** capability detection and user guidance

pub mod devices;
pub mod display;
pub mod permissions;
pub mod portal;

pub use devices::enumerate_devices;
pub use display::*;
