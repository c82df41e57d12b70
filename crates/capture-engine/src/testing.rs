//! In-memory backend, sink and host used by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rawcam_common::error::{RawcamError, RawcamResult};
use rawcam_platform_core::{
    CaptureConstraints, DeviceDescriptor, DeviceKind, DisplayEvent, FullscreenOptions, MonitorInfo,
};
use tokio::sync::{broadcast, Notify};

use crate::backend::{event_bus, CaptureBackend, EventSender};
use crate::discovery::DeviceGroup;
use crate::display::{DisplaySink, FullscreenHost};
use crate::stream::{MediaStream, MediaTrack};

pub fn descriptor(id: &str, kind: DeviceKind, group_id: &str, label: &str) -> DeviceDescriptor {
    DeviceDescriptor::new(id, kind, group_id, label)
}

/// A complete group whose devices are `v-<id>` and `a-<id>`.
pub fn group(group_id: &str, label: &str) -> DeviceGroup {
    DeviceGroup {
        group_id: group_id.to_string(),
        video: descriptor(&format!("v-{group_id}"), DeviceKind::VideoInput, group_id, label),
        audio: descriptor(&format!("a-{group_id}"), DeviceKind::AudioInput, group_id, label),
        label: label.to_string(),
    }
}

#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeTrack {
    kind: DeviceKind,
    device_id: String,
    live: bool,
    stops: Counter,
    live_total: Counter,
}

impl FakeTrack {
    pub fn new(kind: DeviceKind, device_id: &str) -> Self {
        Self::tracked(kind, device_id, Counter::default(), Counter::default())
    }

    fn tracked(kind: DeviceKind, device_id: &str, stops: Counter, live_total: Counter) -> Self {
        live_total.bump();
        Self {
            kind,
            device_id: device_id.to_string(),
            live: true,
            stops,
            live_total,
        }
    }

    pub fn stop_count(&self) -> Counter {
        self.stops.clone()
    }
}

impl MediaTrack for FakeTrack {
    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn stop(&mut self) {
        self.live = false;
        self.stops.bump();
        self.live_total.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct BackendState {
    devices: Vec<DeviceDescriptor>,
    withhold_labels: bool,
    enumerate_error: Option<String>,
    acquire_error: Option<RawcamError>,
    display: Option<MonitorInfo>,
    display_error: bool,
    last_constraints: Option<CaptureConstraints>,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
    enumerations: Counter,
    acquisitions: Counter,
    track_stops: Counter,
    live_tracks: Counter,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeBackend {
    /// One labelled camera+microphone per `(group_id, label)`.
    pub fn webcams(groups: &[(&str, &str)]) -> Arc<Self> {
        let backend = Self::default();
        {
            let mut state = backend.state.lock().unwrap();
            for (group_id, label) in groups {
                let g = group(group_id, label);
                state.devices.push(g.video);
                state.devices.push(g.audio);
            }
        }
        Arc::new(backend)
    }

    pub fn add_device(&self, id: &str, kind: DeviceKind, group_id: &str, label: &str) {
        self.state
            .lock()
            .unwrap()
            .devices
            .push(descriptor(id, kind, group_id, label));
    }

    /// Report empty labels until a stream has been acquired once.
    pub fn withhold_labels_until_probe(&self) {
        self.state.lock().unwrap().withhold_labels = true;
    }

    pub fn fail_enumeration(&self, err: RawcamError) {
        self.state.lock().unwrap().enumerate_error = Some(err.to_string());
    }

    pub fn fail_acquisition(&self, err: RawcamError) {
        self.state.lock().unwrap().acquire_error = Some(err);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.enumerate_error = None;
        state.acquire_error = None;
    }

    pub fn set_display(&self, width: u32, height: u32) {
        self.state.lock().unwrap().display = Some(MonitorInfo {
            width,
            height,
            ..MonitorInfo::default()
        });
    }

    pub fn fail_display(&self) {
        self.state.lock().unwrap().display_error = true;
    }

    /// Make acquisitions wait until the returned handle is notified.
    pub fn hold_acquisitions(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn enumerations(&self) -> usize {
        self.enumerations.get()
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.get()
    }

    pub fn track_stops(&self) -> usize {
        self.track_stops.get()
    }

    pub fn live_tracks(&self) -> usize {
        self.live_tracks.get()
    }

    pub fn last_constraints(&self) -> Option<CaptureConstraints> {
        self.state.lock().unwrap().last_constraints.clone()
    }

    fn first_of(&self, kind: DeviceKind) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .devices
            .iter()
            .find(|d| d.kind == kind)
            .map(|d| d.id.clone())
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FakeBackend {
    async fn enumerate_devices(&self) -> RawcamResult<Vec<DeviceDescriptor>> {
        self.enumerations.bump();
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.enumerate_error {
            return Err(RawcamError::platform(message.clone()));
        }
        let mut devices = state.devices.clone();
        if state.withhold_labels {
            for device in &mut devices {
                device.label.clear();
            }
        }
        Ok(devices)
    }

    async fn acquire_stream(&self, constraints: &CaptureConstraints) -> RawcamResult<MediaStream> {
        self.acquisitions.bump();
        self.state.lock().unwrap().last_constraints = Some(constraints.clone());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(err) = self.state.lock().unwrap().acquire_error.take() {
            return Err(err);
        }

        let video = match constraints.video.device.exact_id() {
            Some(id) => id.to_string(),
            None => self
                .first_of(DeviceKind::VideoInput)
                .ok_or_else(|| RawcamError::platform("no camera"))?,
        };
        let audio = match constraints.audio.device.exact_id() {
            Some(id) => id.to_string(),
            None => self
                .first_of(DeviceKind::AudioInput)
                .ok_or_else(|| RawcamError::platform("no microphone"))?,
        };

        self.state.lock().unwrap().withhold_labels = false;
        let tracks: Vec<Box<dyn MediaTrack>> = vec![
            Box::new(FakeTrack::tracked(
                DeviceKind::VideoInput,
                &video,
                self.track_stops.clone(),
                self.live_tracks.clone(),
            )),
            Box::new(FakeTrack::tracked(
                DeviceKind::AudioInput,
                &audio,
                self.track_stops.clone(),
                self.live_tracks.clone(),
            )),
        ];
        Ok(MediaStream::new(
            format!("stream-{}", self.acquisitions()),
            tracks,
        ))
    }

    fn primary_display(&self) -> RawcamResult<MonitorInfo> {
        let state = self.state.lock().unwrap();
        if state.display_error {
            return Err(RawcamError::platform("no display"));
        }
        Ok(state.display.clone().unwrap_or_default())
    }
}

#[derive(Default)]
struct SinkState {
    bound: Option<String>,
    fail_attach: bool,
    defer_mount: bool,
}

/// Records bindings; optionally announces mounts on an event bus.
#[derive(Clone, Default)]
pub struct FakeSink {
    state: Arc<Mutex<SinkState>>,
    events: Option<EventSender>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: EventSender) -> Self {
        Self {
            events: Some(events),
            ..Self::default()
        }
    }

    pub fn fail_attach(&self) {
        self.state.lock().unwrap().fail_attach = true;
    }

    /// Never announce mounts.
    pub fn defer_mount(&self) {
        self.state.lock().unwrap().defer_mount = true;
    }

    pub fn is_bound(&self) -> bool {
        self.state.lock().unwrap().bound.is_some()
    }
}

impl DisplaySink for FakeSink {
    fn attach(&mut self, stream: &MediaStream) -> RawcamResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_attach {
            return Err(RawcamError::platform("surface unavailable"));
        }
        state.bound = Some(stream.id().to_string());
        if let (false, Some(events)) = (state.defer_mount, &self.events) {
            let _ = events.send(DisplayEvent::SinkMounted {
                stream_id: stream.id().to_string(),
            });
        }
        Ok(())
    }

    fn detach(&mut self) {
        self.state.lock().unwrap().bound = None;
    }

    fn is_bound(&self) -> bool {
        FakeSink::is_bound(self)
    }
}

/// Compositor stand-in that reports every state change on its bus.
pub struct FakeHost {
    events: EventSender,
    fullscreen: AtomicBool,
    refuse: AtomicBool,
    requests: Counter,
    exits: Counter,
    last_options: Mutex<Option<FullscreenOptions>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: event_bus(),
            fullscreen: AtomicBool::new(false),
            refuse: AtomicBool::new(false),
            requests: Counter::default(),
            exits: Counter::default(),
            last_options: Mutex::new(None),
        })
    }

    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    pub fn refuse_requests(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    /// Simulate the user pressing Escape.
    pub fn user_exits(&self) {
        self.fullscreen.store(false, Ordering::SeqCst);
        let _ = self
            .events
            .send(DisplayEvent::FullscreenChanged { fullscreen: false });
    }

    pub fn requests(&self) -> usize {
        self.requests.get()
    }

    pub fn exits(&self) -> usize {
        self.exits.get()
    }

    pub fn last_options(&self) -> Option<FullscreenOptions> {
        *self.last_options.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl FullscreenHost for FakeHost {
    async fn request_fullscreen(&self, options: FullscreenOptions) -> RawcamResult<()> {
        self.requests.bump();
        *self.last_options.lock().unwrap() = Some(options);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(RawcamError::platform("request denied"));
        }
        self.fullscreen.store(true, Ordering::SeqCst);
        let _ = self
            .events
            .send(DisplayEvent::FullscreenChanged { fullscreen: true });
        Ok(())
    }

    async fn exit_fullscreen(&self) -> RawcamResult<()> {
        self.exits.bump();
        if self.fullscreen.swap(false, Ordering::SeqCst) {
            let _ = self
                .events
                .send(DisplayEvent::FullscreenChanged { fullscreen: false });
        }
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<DisplayEvent> {
        self.events.subscribe()
    }
}
