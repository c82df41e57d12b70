//! Rawcam Capture Engine
//!
//! Discovers physically bundled camera+microphone pairs, runs a single raw
//! capture session for the chosen pair, and couples that session to the
//! compositor's full-screen state.
//!
//! # Architecture
//!
//! ```text
//!   CaptureBackend ──► DeviceDiscovery ──► DeviceGroupSelector
//!   (v4l2 + alsa)                               │ selected group
//!                                               ▼
//!   DisplaySink ◄────── attach / detach ─── StreamSession
//!   (preview window)                            ▲ forced stop
//!        │                                      │
//!        └──────► DisplayEvent bus ──────► FullscreenBinder ◄──► FullscreenHost
//! ```

pub mod backend;
pub mod controller;
pub mod discovery;
pub mod display;
pub mod fullscreen;
pub mod pipeline;
pub mod preview;
pub mod selector;
pub mod session;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{event_bus, CaptureBackend, EventSender, LinuxBackend};
pub use controller::{CaptureController, DiscoveryStatus};
pub use discovery::{pair_devices, DeviceDiscovery, DeviceGroup, FALLBACK_LABEL};
pub use display::{DisplaySink, FullscreenHost};
pub use fullscreen::{FullscreenBinder, HostSignals, View};
pub use preview::{PreviewHost, PreviewWindow};
pub use selector::DeviceGroupSelector;
pub use session::{CaptureSession, SessionState, StreamSession};
pub use stream::{MediaStream, MediaTrack};
