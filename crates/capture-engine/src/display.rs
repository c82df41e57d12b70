//! Host-side display contracts: the sink a stream renders into and the
//! compositor that owns full-screen state.

use rawcam_common::error::RawcamResult;
use rawcam_platform_core::{DisplayEvent, FullscreenOptions};
use tokio::sync::broadcast;

use crate::stream::MediaStream;

/// The on-screen surface an active stream is bound to.
pub trait DisplaySink: Send {
    /// Bind `stream` for display. Once the surface has rendered, the sink
    /// publishes [`DisplayEvent::SinkMounted`] for that stream.
    fn attach(&mut self, stream: &MediaStream) -> RawcamResult<()>;

    /// Unbind whatever stream is attached. No-op when unbound.
    fn detach(&mut self);

    fn is_bound(&self) -> bool;
}

/// Full-screen primitives of the host compositor.
///
/// Full-screen state is owned by the compositor: it may change without any
/// request from us, and every change is reported on [`Self::subscribe`].
#[async_trait::async_trait]
pub trait FullscreenHost: Send + Sync {
    async fn request_fullscreen(&self, options: FullscreenOptions) -> RawcamResult<()>;

    async fn exit_fullscreen(&self) -> RawcamResult<()>;

    fn is_fullscreen(&self) -> bool;

    /// Subscribe to display events (full-screen changes, sink mounts, media
    /// pauses, device loss). The subscription lives as long as the receiver.
    fn subscribe(&self) -> broadcast::Receiver<DisplayEvent>;
}
