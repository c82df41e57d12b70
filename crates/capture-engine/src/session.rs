//! Capture session lifecycle: acquire, bind to the display sink, release.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rawcam_common::error::{RawcamError, RawcamResult};
use rawcam_platform_core::{CaptureConstraints, MonitorInfo};
use serde::Serialize;
use tokio::sync::watch;

use crate::backend::CaptureBackend;
use crate::discovery::DeviceGroup;
use crate::display::DisplaySink;
use crate::stream::MediaStream;

/// State of the stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No stream held.
    Idle,
    /// Acquisition in flight; runs to completion.
    Starting,
    /// Stream acquired and bound to the sink.
    Active,
    /// Tracks being released.
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Active => "active",
            SessionState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// The live capture resource. At most one exists at a time.
#[derive(Debug)]
pub struct CaptureSession {
    pub group_id: String,
    pub video_device_id: String,
    pub audio_device_id: String,
    stream: MediaStream,
    active: bool,
}

impl CaptureSession {
    pub fn stream(&self) -> &MediaStream {
        &self.stream
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

struct SessionInner {
    state: SessionState,
    capture: Option<CaptureSession>,
    sink: Box<dyn DisplaySink>,
}

/// Owns the single capture session and its display binding.
///
/// Cloning yields another handle to the same session. State changes are
/// published on a watch channel; see [`StreamSession::subscribe`].
#[derive(Clone)]
pub struct StreamSession {
    inner: Arc<Mutex<SessionInner>>,
    backend: Arc<dyn CaptureBackend>,
    state_tx: Arc<watch::Sender<SessionState>>,
}

impl StreamSession {
    pub fn new(backend: Arc<dyn CaptureBackend>, sink: Box<dyn DisplaySink>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Idle,
                capture: None,
                sink,
            })),
            backend,
            state_tx: Arc::new(state_tx),
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Id of the stream currently bound to the sink.
    pub fn active_stream_id(&self) -> Option<String> {
        self.lock()
            .capture
            .as_ref()
            .map(|c| c.stream.id().to_string())
    }

    /// Whether the active session holds a track on `device_id`.
    pub fn uses_device(&self, device_id: &str) -> bool {
        self.lock()
            .capture
            .as_ref()
            .map(|c| c.stream.uses_device(device_id))
            .unwrap_or(false)
    }

    /// Live tracks held by the session.
    pub fn live_tracks(&self) -> usize {
        self.lock()
            .capture
            .as_ref()
            .map(|c| c.stream.live_tracks())
            .unwrap_or(0)
    }

    pub fn sink_bound(&self) -> bool {
        self.lock().sink.is_bound()
    }

    /// Acquire a raw stream for `group` and bind it to the display sink.
    ///
    /// Rejected with [`RawcamError::SessionBusy`] unless the session is idle.
    /// On failure the session returns to idle with nothing held.
    pub async fn start(&self, group: &DeviceGroup) -> RawcamResult<()> {
        {
            let mut inner = self.lock();
            if inner.state != SessionState::Idle {
                tracing::warn!(state = %inner.state, group = %group.group_id, "Start rejected");
                return Err(RawcamError::busy(inner.state));
            }
            self.transition(&mut inner, SessionState::Starting);
        }
        let mut guard = StartGuard {
            session: self,
            armed: true,
        };

        let display = self.backend.primary_display().unwrap_or_else(|e| {
            let fallback = MonitorInfo::default();
            tracing::warn!(
                error = %e,
                width = fallback.width,
                height = fallback.height,
                "Display size unknown; using default ideal resolution"
            );
            fallback
        });
        let constraints = CaptureConstraints::raw(&group.video.id, &group.audio.id, &display);

        tracing::info!(
            group = %group.group_id,
            video = %group.video.id,
            audio = %group.audio.id,
            ideal_width = display.width,
            ideal_height = display.height,
            "Acquiring capture stream"
        );

        let mut stream = match self.backend.acquire_stream(&constraints).await {
            Ok(stream) => stream,
            Err(e) => {
                let err = e.into_stream_acquisition();
                tracing::warn!(error = %err, group = %group.group_id, "Stream acquisition failed");
                return Err(err);
            }
        };

        let mut inner = self.lock();
        if let Err(e) = inner.sink.attach(&stream) {
            inner.sink.detach();
            let stopped = stream.stop_all();
            let err = e.into_stream_acquisition();
            tracing::warn!(error = %err, stopped, "Binding stream to display failed");
            return Err(err);
        }

        tracing::info!(stream = %stream.id(), tracks = stream.live_tracks(), "Capture stream active");
        inner.capture = Some(CaptureSession {
            group_id: group.group_id.clone(),
            video_device_id: group.video.id.clone(),
            audio_device_id: group.audio.id.clone(),
            stream,
            active: true,
        });
        self.transition(&mut inner, SessionState::Active);
        guard.armed = false;
        Ok(())
    }

    /// Release the active stream and unbind the sink.
    ///
    /// Returns `Ok(false)` when there was nothing to stop. A stop while a
    /// start is in flight is rejected with [`RawcamError::SessionBusy`].
    pub fn stop(&self) -> RawcamResult<bool> {
        let mut inner = self.lock();
        match inner.state {
            SessionState::Idle | SessionState::Stopping => return Ok(false),
            SessionState::Starting => return Err(RawcamError::busy(inner.state)),
            SessionState::Active => {}
        }

        self.transition(&mut inner, SessionState::Stopping);
        if let Some(mut capture) = inner.capture.take() {
            capture.active = false;
            let stopped = capture.stream.stop_all();
            tracing::info!(
                group = %capture.group_id,
                stream = %capture.stream.id(),
                stopped,
                "Capture stream released"
            );
        }
        inner.sink.detach();
        self.transition(&mut inner, SessionState::Idle);
        Ok(true)
    }

    fn transition(&self, inner: &mut SessionInner, next: SessionState) {
        tracing::debug!(from = %inner.state, to = %next, "Session state change");
        inner.state = next;
        self.state_tx.send_replace(next);
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns a session stuck in `Starting` to `Idle` if the start future is
/// dropped or fails before completing.
struct StartGuard<'a> {
    session: &'a StreamSession,
    armed: bool,
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.session.lock();
            if inner.state == SessionState::Starting {
                self.session.transition(&mut inner, SessionState::Idle);
            }
        }
    }
}
