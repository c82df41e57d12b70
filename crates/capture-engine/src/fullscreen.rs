//! Couples the stream session to the compositor's full-screen state.
//!
//! Two directions:
//! - session becomes active and the sink confirms it has mounted the stream
//!   → request full-screen;
//! - compositor reports that nothing is full-screen any more (user, OS or
//!   our own exit request), or the sink reports a pause → stop the session
//!   and send the host back to the selection view.

use std::sync::Arc;
use std::time::Duration;

use rawcam_common::config::SessionDefaults;
use rawcam_common::notice::Notice;
use rawcam_platform_core::{DisplayEvent, FullscreenOptions};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;

use crate::display::FullscreenHost;
use crate::session::{SessionState, StreamSession};

/// Which view the host UI should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Selection,
    Streaming,
}

/// Outbound channels to the host UI.
#[derive(Clone)]
pub struct HostSignals {
    pub views: Arc<watch::Sender<View>>,
    pub notices: mpsc::UnboundedSender<Notice>,
}

impl HostSignals {
    fn show(&self, view: View) {
        self.views.send_if_modified(|current| {
            let changed = *current != view;
            *current = view;
            changed
        });
    }

    fn notify(&self, notice: Notice) {
        // The host may have stopped listening during shutdown.
        let _ = self.notices.send(notice);
    }
}

/// Drives full-screen entry and forced stops for one [`StreamSession`].
///
/// The display-event subscription is owned by the binder and ends when it
/// is dropped.
pub struct FullscreenBinder {
    session: StreamSession,
    host: Arc<dyn FullscreenHost>,
    signals: HostSignals,
    states: watch::Receiver<SessionState>,
    events: broadcast::Receiver<DisplayEvent>,
    options: FullscreenOptions,
    mount_timeout: Duration,
    stop_on_device_loss: bool,
    mounted_stream: Option<String>,
    requested_stream: Option<String>,
    mount_deadline: Option<Instant>,
}

impl FullscreenBinder {
    pub fn new(
        session: StreamSession,
        host: Arc<dyn FullscreenHost>,
        signals: HostSignals,
        config: &SessionDefaults,
    ) -> Self {
        let states = session.subscribe();
        let events = host.subscribe();
        Self {
            session,
            host,
            signals,
            states,
            events,
            options: FullscreenOptions {
                hide_navigation: config.hide_navigation,
            },
            mount_timeout: Duration::from_millis(config.sink_mount_timeout_ms),
            stop_on_device_loss: config.stop_on_device_loss,
            mounted_stream: None,
            requested_stream: None,
            mount_deadline: None,
        }
    }

    /// Process session transitions and display events until `shutdown`
    /// flips to true or either channel closes.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::debug!("Full-screen binder running");
        let initial = *self.states.borrow_and_update();
        self.on_state(initial).await;

        loop {
            let deadline = self.mount_deadline;
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                changed = self.states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *self.states.borrow_and_update();
                    self.on_state(state).await;
                }
                event = self.events.recv() => match event {
                    Ok(event) => self.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Display events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                    self.on_mount_timeout();
                }
            }
        }
        tracing::debug!("Full-screen binder stopped");
    }

    /// React to a session state observed on the watch channel.
    pub async fn on_state(&mut self, state: SessionState) {
        match state {
            SessionState::Active => {
                self.signals.show(View::Streaming);
                if self.requested_stream.is_none() {
                    self.mount_deadline = Some(Instant::now() + self.mount_timeout);
                }
                self.try_enter_fullscreen().await;
            }
            SessionState::Idle => {
                self.mounted_stream = None;
                self.requested_stream = None;
                self.mount_deadline = None;
                self.signals.show(View::Selection);
            }
            SessionState::Starting | SessionState::Stopping => {}
        }
    }

    /// React to one display event.
    pub async fn handle_event(&mut self, event: DisplayEvent) {
        tracing::trace!(?event, "Display event");
        match event {
            DisplayEvent::SinkMounted { stream_id } => {
                self.mounted_stream = Some(stream_id);
                self.try_enter_fullscreen().await;
            }
            DisplayEvent::FullscreenChanged { fullscreen: true } => {
                tracing::debug!("Compositor entered full-screen");
            }
            DisplayEvent::FullscreenChanged { fullscreen: false } => {
                self.force_stop("full-screen exited");
            }
            DisplayEvent::MediaPaused => self.on_paused().await,
            DisplayEvent::DeviceLost { device_id } => self.on_device_lost(&device_id).await,
        }
    }

    async fn try_enter_fullscreen(&mut self) {
        if !self.session.is_active() {
            return;
        }
        let Some(active) = self.session.active_stream_id() else {
            return;
        };
        if self.mounted_stream.as_deref() != Some(active.as_str())
            || self.requested_stream.as_deref() == Some(active.as_str())
        {
            return;
        }

        self.requested_stream = Some(active.clone());
        self.mount_deadline = None;
        tracing::info!(stream = %active, hide_navigation = self.options.hide_navigation, "Requesting full-screen");

        if let Err(e) = self.host.request_fullscreen(self.options).await {
            let err = e.into_fullscreen();
            tracing::warn!(error = %err, stream = %active, "Staying in windowed view");
        }
    }

    async fn on_paused(&mut self) {
        if !self.host.is_fullscreen() {
            // No full-screen to leave, so no exit notification will follow.
            self.force_stop("media paused");
            return;
        }
        tracing::info!("Media paused; leaving full-screen");
        if let Err(e) = self.host.exit_fullscreen().await {
            tracing::warn!(error = %e.into_fullscreen(), "Exit request failed; stopping directly");
            self.force_stop("media paused");
        }
    }

    async fn on_device_lost(&mut self, device_id: &str) {
        if !self.session.uses_device(device_id) {
            tracing::debug!(device = device_id, "Unrelated device disappeared");
            return;
        }
        if !self.stop_on_device_loss {
            tracing::warn!(device = device_id, "Active capture device disappeared");
            return;
        }

        tracing::warn!(device = device_id, "Active capture device disconnected; stopping");
        self.force_stop("device lost");
        self.signals.notify(Notice::transient(format!(
            "Capture device disconnected ({device_id})"
        )));
        if self.host.is_fullscreen() {
            if let Err(e) = self.host.exit_fullscreen().await {
                tracing::warn!(error = %e.into_fullscreen(), "Could not leave full-screen");
            }
        }
    }

    fn on_mount_timeout(&mut self) {
        self.mount_deadline = None;
        // A late mount for this stream must not pull it into full-screen.
        self.requested_stream = self.session.active_stream_id();
        tracing::warn!(
            timeout_ms = self.mount_timeout.as_millis() as u64,
            "Display sink never confirmed mount; not requesting full-screen"
        );
    }

    fn force_stop(&mut self, reason: &str) {
        match self.session.stop() {
            Ok(true) => tracing::info!(reason, "Session stopped"),
            Ok(false) => tracing::debug!(reason, "Session already idle"),
            Err(e) => tracing::warn!(reason, error = %e, "Could not stop session"),
        }
        self.signals.show(View::Selection);
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{group, FakeBackend, FakeHost, FakeSink};

    struct Rig {
        backend: Arc<FakeBackend>,
        sink: FakeSink,
        host: Arc<FakeHost>,
        session: StreamSession,
        binder: FullscreenBinder,
        views: watch::Receiver<View>,
        notices: mpsc::UnboundedReceiver<Notice>,
    }

    fn rig(config: SessionDefaults) -> Rig {
        let backend = FakeBackend::webcams(&[("g1", "Cam")]);
        let host = FakeHost::new();
        let sink = FakeSink::with_events(host.events());
        let session = StreamSession::new(backend.clone(), Box::new(sink.clone()));
        let (views_tx, views) = watch::channel(View::Selection);
        let (notices_tx, notices) = mpsc::unbounded_channel();
        let signals = HostSignals {
            views: Arc::new(views_tx),
            notices: notices_tx,
        };
        let binder = FullscreenBinder::new(session.clone(), host.clone(), signals, &config);
        Rig {
            backend,
            sink,
            host,
            session,
            binder,
            views,
            notices,
        }
    }

    async fn start_and_settle(rig: &mut Rig) {
        rig.session.start(&group("g1", "Cam")).await.unwrap();
        rig.binder.on_state(SessionState::Active).await;
        while let Ok(event) = rig.binder.events.try_recv() {
            rig.binder.handle_event(event).await;
        }
    }

    #[tokio::test]
    async fn fullscreen_is_requested_only_after_sink_mount() {
        let mut rig = rig(SessionDefaults::default());
        rig.sink.defer_mount();
        rig.session.start(&group("g1", "Cam")).await.unwrap();
        rig.binder.on_state(SessionState::Active).await;

        assert_eq!(rig.host.requests(), 0);
        assert_eq!(*rig.views.borrow(), View::Streaming);

        let stream_id = rig.session.active_stream_id().unwrap();
        rig.binder
            .handle_event(DisplayEvent::SinkMounted { stream_id })
            .await;
        assert_eq!(rig.host.requests(), 1);
        assert!(rig.host.is_fullscreen());
        assert!(rig.host.last_options().unwrap().hide_navigation);
    }

    #[tokio::test]
    async fn mount_before_state_change_still_requests_once() {
        let mut rig = rig(SessionDefaults::default());
        rig.session.start(&group("g1", "Cam")).await.unwrap();
        while let Ok(event) = rig.binder.events.try_recv() {
            rig.binder.handle_event(event).await;
        }
        rig.binder.on_state(SessionState::Active).await;
        rig.binder.on_state(SessionState::Active).await;

        assert_eq!(rig.host.requests(), 1);
    }

    #[tokio::test]
    async fn stale_mount_for_another_stream_is_ignored() {
        let mut rig = rig(SessionDefaults::default());
        rig.sink.defer_mount();
        rig.session.start(&group("g1", "Cam")).await.unwrap();
        rig.binder.on_state(SessionState::Active).await;
        rig.binder
            .handle_event(DisplayEvent::SinkMounted {
                stream_id: "previous".into(),
            })
            .await;
        assert_eq!(rig.host.requests(), 0);
    }

    #[tokio::test]
    async fn fullscreen_failure_keeps_stream_active() {
        let mut rig = rig(SessionDefaults::default());
        rig.host.refuse_requests();
        start_and_settle(&mut rig).await;

        assert_eq!(rig.host.requests(), 1);
        assert!(rig.session.is_active());
        assert_eq!(*rig.views.borrow(), View::Streaming);
        assert!(rig.notices.try_recv().is_err(), "full-screen errors are log-only");
    }

    #[tokio::test]
    async fn external_fullscreen_exit_stops_session() {
        let mut rig = rig(SessionDefaults::default());
        start_and_settle(&mut rig).await;
        assert!(rig.host.is_fullscreen());

        rig.host.user_exits();
        while let Ok(event) = rig.binder.events.try_recv() {
            rig.binder.handle_event(event).await;
        }

        assert_eq!(rig.session.state(), SessionState::Idle);
        assert_eq!(rig.backend.live_tracks(), 0);
        assert!(!rig.sink.is_bound());
        assert_eq!(*rig.views.borrow(), View::Selection);
    }

    #[tokio::test]
    async fn pause_exits_fullscreen_which_stops_session() {
        let mut rig = rig(SessionDefaults::default());
        start_and_settle(&mut rig).await;

        rig.binder.handle_event(DisplayEvent::MediaPaused).await;
        assert_eq!(rig.host.exits(), 1);
        // Stop happens through the resulting notification.
        assert!(rig.session.is_active());

        while let Ok(event) = rig.binder.events.try_recv() {
            rig.binder.handle_event(event).await;
        }
        assert_eq!(rig.session.state(), SessionState::Idle);
        assert_eq!(rig.backend.live_tracks(), 0);
        assert!(!rig.sink.is_bound());
    }

    #[tokio::test]
    async fn pause_without_fullscreen_stops_directly() {
        let mut rig = rig(SessionDefaults::default());
        rig.host.refuse_requests();
        start_and_settle(&mut rig).await;

        rig.binder.handle_event(DisplayEvent::MediaPaused).await;
        assert_eq!(rig.host.exits(), 0);
        assert_eq!(rig.session.state(), SessionState::Idle);
        assert_eq!(rig.backend.live_tracks(), 0);
    }

    #[tokio::test]
    async fn losing_an_active_device_forces_stop_with_notice() {
        let mut rig = rig(SessionDefaults::default());
        start_and_settle(&mut rig).await;

        rig.binder
            .handle_event(DisplayEvent::DeviceLost {
                device_id: "a-g1".into(),
            })
            .await;

        assert_eq!(rig.session.state(), SessionState::Idle);
        assert_eq!(rig.backend.live_tracks(), 0);
        assert!(!rig.host.is_fullscreen());
        let notice = rig.notices.try_recv().unwrap();
        assert!(!notice.persistent);
        assert!(notice.text.contains("a-g1"));
    }

    #[tokio::test]
    async fn losing_an_unrelated_device_is_ignored() {
        let mut rig = rig(SessionDefaults::default());
        start_and_settle(&mut rig).await;

        rig.binder
            .handle_event(DisplayEvent::DeviceLost {
                device_id: "/dev/video9".into(),
            })
            .await;
        assert!(rig.session.is_active());
    }

    #[tokio::test]
    async fn device_loss_policy_can_be_disabled() {
        let mut rig = rig(SessionDefaults {
            stop_on_device_loss: false,
            ..SessionDefaults::default()
        });
        start_and_settle(&mut rig).await;

        rig.binder
            .handle_event(DisplayEvent::DeviceLost {
                device_id: "v-g1".into(),
            })
            .await;
        assert!(rig.session.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_drives_full_cycle_and_honours_shutdown() {
        let Rig {
            backend,
            host,
            session,
            binder,
            views,
            ..
        } = rig(SessionDefaults::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(binder.run(shutdown_rx));

        session.start(&group("g1", "Cam")).await.unwrap();
        while host.requests() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(*views.borrow(), View::Streaming);

        host.user_exits();
        while session.state() != SessionState::Idle {
            tokio::task::yield_now().await;
        }
        assert_eq!(backend.live_tracks(), 0);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn missing_mount_times_out_and_ignores_late_mount() {
        let Rig {
            sink,
            host,
            session,
            binder,
            ..
        } = rig(SessionDefaults {
            sink_mount_timeout_ms: 100,
            ..SessionDefaults::default()
        });
        sink.defer_mount();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(binder.run(shutdown_rx));

        session.start(&group("g1", "Cam")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(host.requests(), 0);
        assert!(session.is_active());

        let stream_id = session.active_stream_id().unwrap();
        host.events()
            .send(DisplayEvent::SinkMounted { stream_id })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(host.requests(), 0, "late mount stays windowed");
        assert!(session.is_active());

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }
}
