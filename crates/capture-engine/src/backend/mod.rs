use rawcam_common::error::RawcamResult;
use rawcam_platform_core::{CaptureConstraints, DeviceDescriptor, DisplayEvent, MonitorInfo};
use tokio::sync::broadcast;

use crate::stream::MediaStream;

/// Sender half of the display event bus shared by the backend, the display
/// sink and the full-screen host.
pub type EventSender = broadcast::Sender<DisplayEvent>;

/// Abstract interface for platform-specific capture capabilities.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Enumerate raw device descriptors. May suspend on a permission prompt.
    async fn enumerate_devices(&self) -> RawcamResult<Vec<DeviceDescriptor>>;

    /// Open a stream matching `constraints`. Exact device ids that cannot be
    /// satisfied are errors; ideal values are best effort.
    async fn acquire_stream(&self, constraints: &CaptureConstraints) -> RawcamResult<MediaStream>;

    /// The display that hosts full-screen output.
    fn primary_display(&self) -> RawcamResult<MonitorInfo>;
}

pub mod linux;

pub use linux::LinuxBackend;

/// Create a display event bus.
pub fn event_bus() -> EventSender {
    broadcast::channel(64).0
}
