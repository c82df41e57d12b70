//! The capture controller: one explicitly constructed object that the host
//! presentation layer drives.
//!
//! ```text
//!   discover() ──► DeviceDiscovery ──► DeviceGroupSelector
//!                                           │ selected group
//!   start() ─────────────────────────► StreamSession ──► DisplaySink
//!                                           ▲ stop()
//!   binder().run() ── FullscreenBinder ─────┘ ◄── FullscreenHost events
//! ```

use std::sync::Arc;

use rawcam_common::config::SessionDefaults;
use rawcam_common::error::{RawcamError, RawcamResult};
use rawcam_common::notice::Notice;
use tokio::sync::{mpsc, watch};

use crate::backend::CaptureBackend;
use crate::discovery::{DeviceDiscovery, DeviceGroup};
use crate::display::{DisplaySink, FullscreenHost};
use crate::fullscreen::{FullscreenBinder, HostSignals, View};
use crate::selector::DeviceGroupSelector;
use crate::session::{SessionState, StreamSession};

/// Outcome of the discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryStatus {
    Pending,
    Ready,
    /// Discovery failed; the message replaces the selection UI until reload.
    Failed(String),
}

pub struct CaptureController {
    discovery: DeviceDiscovery,
    selector: DeviceGroupSelector,
    status: DiscoveryStatus,
    session: StreamSession,
    host: Arc<dyn FullscreenHost>,
    config: SessionDefaults,
    signals: HostSignals,
    notices: mpsc::UnboundedReceiver<Notice>,
    shutdown: watch::Sender<bool>,
}

impl CaptureController {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        sink: Box<dyn DisplaySink>,
        host: Arc<dyn FullscreenHost>,
        config: SessionDefaults,
    ) -> Self {
        let (views, _) = watch::channel(View::Selection);
        let (notices_tx, notices) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        Self {
            discovery: DeviceDiscovery::new(backend.clone()),
            selector: DeviceGroupSelector::default(),
            status: DiscoveryStatus::Pending,
            session: StreamSession::new(backend, sink),
            host,
            config,
            signals: HostSignals {
                views: Arc::new(views),
                notices: notices_tx,
            },
            notices,
            shutdown,
        }
    }

    /// Run discovery. Groups become selectable only after this completes.
    pub async fn discover(&mut self) -> RawcamResult<&[DeviceGroup]> {
        match self.discovery.discover().await {
            Ok(groups) => {
                self.selector.refresh(groups);
                self.status = DiscoveryStatus::Ready;
                Ok(self.selector.groups())
            }
            Err(e) => {
                tracing::error!(error = %e, "Device discovery failed");
                self.status = DiscoveryStatus::Failed(e.to_string());
                self.report(&e);
                Err(e)
            }
        }
    }

    pub fn discovery_status(&self) -> &DiscoveryStatus {
        &self.status
    }

    pub fn groups(&self) -> &[DeviceGroup] {
        self.selector.groups()
    }

    pub fn selected_group_id(&self) -> &str {
        self.selector.selected_group_id()
    }

    pub fn set_selection(&mut self, group_id: impl Into<String>) {
        self.selector.set_selection(group_id);
    }

    /// Start streaming the selected group.
    ///
    /// Returns `Ok(false)` without touching the hardware when discovery has
    /// not completed or the selection matches no group.
    pub async fn start(&self) -> RawcamResult<bool> {
        if self.status != DiscoveryStatus::Ready {
            tracing::debug!(status = ?self.status, "Start ignored before discovery");
            return Ok(false);
        }
        let Some(group) = self.selector.selected_group().cloned() else {
            tracing::debug!(
                selection = %self.selector.selected_group_id(),
                "Start ignored: selection matches no group"
            );
            return Ok(false);
        };

        match self.session.start(&group).await {
            Ok(()) => Ok(true),
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Stop streaming. No-op when idle.
    pub fn stop(&self) -> RawcamResult<bool> {
        self.session.stop()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_active()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// View the host UI should currently show.
    pub fn views(&self) -> watch::Receiver<View> {
        self.signals.views.subscribe()
    }

    /// Next pending notice, if any.
    pub fn try_next_notice(&mut self) -> Option<Notice> {
        self.notices.try_recv().ok()
    }

    /// Wait for the next notice.
    pub async fn next_notice(&mut self) -> Option<Notice> {
        self.notices.recv().await
    }

    /// Build the full-screen binder for this controller. Spawn its
    /// [`FullscreenBinder::run`]; it exits on [`Self::shutdown`].
    pub fn binder(&self) -> (FullscreenBinder, watch::Receiver<bool>) {
        let binder = FullscreenBinder::new(
            self.session.clone(),
            self.host.clone(),
            self.signals.clone(),
            &self.config,
        );
        (binder, self.shutdown.subscribe())
    }

    /// Stop any active stream and end the binder's subscription.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down capture controller");
        if let Err(e) = self.session.stop() {
            tracing::warn!(error = %e, "Session still starting at shutdown");
        }
        self.shutdown.send_replace(true);
    }

    fn report(&self, err: &RawcamError) {
        if let Some(notice) = Notice::from_error(err) {
            let _ = self.signals.notices.send(notice);
        }
    }
}
