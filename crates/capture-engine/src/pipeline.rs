//! GStreamer plumbing for capture tracks.
//!
//! Every track is its own pipeline that ends in an `inter*sink` on a channel
//! named after the stream, so a display sink can pick the stream up without
//! sharing a pipeline with the capture side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use gst::prelude::*;
use gstreamer as gst;
use rawcam_common::error::{RawcamError, RawcamResult};
use rawcam_platform_core::{AudioConstraints, DeviceKind, DisplayEvent, VideoConstraints};

use crate::backend::EventSender;
use crate::stream::MediaTrack;

/// How long a pipeline may take to reach Playing.
const STATE_TIMEOUT_SECS: u64 = 10;

/// Poll interval of the bus watcher thread.
const BUS_POLL_MS: u64 = 100;

/// A launched GStreamer pipeline.
pub struct GstPipeline {
    name: String,
    pipeline: gst::Pipeline,
    running: bool,
    watcher: Option<BusWatcher>,
}

impl GstPipeline {
    pub fn from_launch(name: impl Into<String>, launch: &str) -> RawcamResult<Self> {
        init_gstreamer()?;
        let name = name.into();
        tracing::debug!(pipeline = %name, launch, "Building pipeline");

        let element = gst::parse::launch(launch).map_err(|e| {
            RawcamError::platform(format!("Failed to build {name} pipeline: {e}"))
        })?;
        let pipeline = element.dynamic_cast::<gst::Pipeline>().map_err(|_| {
            RawcamError::platform(format!("Launch string for {name} did not produce a pipeline"))
        })?;

        Ok(Self {
            name,
            pipeline,
            running: false,
            watcher: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pipeline(&self) -> &gst::Pipeline {
        &self.pipeline
    }

    /// Hand every bus message to `handler` on a background thread until the
    /// pipeline is stopped.
    pub fn watch_bus<F>(&mut self, handler: F) -> RawcamResult<()>
    where
        F: FnMut(&gst::Message) + Send + 'static,
    {
        let bus = self.pipeline.bus().ok_or_else(|| {
            RawcamError::platform(format!("{} pipeline has no bus", self.name))
        })?;
        self.watcher = Some(BusWatcher::spawn(&self.name, bus, handler)?);
        Ok(())
    }

    /// Set the pipeline playing without waiting for the transition.
    pub fn play(&mut self) -> RawcamResult<()> {
        self.pipeline.set_state(gst::State::Playing).map_err(|e| {
            RawcamError::platform(format!("Failed to start {} pipeline: {e:?}", self.name))
        })?;
        self.running = true;
        Ok(())
    }

    /// Set the pipeline playing and wait until the source is open.
    pub fn start(&mut self) -> RawcamResult<()> {
        self.play()?;

        match self
            .pipeline
            .state(gst::ClockTime::from_seconds(STATE_TIMEOUT_SECS))
        {
            (Ok(_), gst::State::Playing, _) => {
                tracing::debug!(pipeline = %self.name, "Pipeline playing");
                Ok(())
            }
            (Ok(_), state, _) => {
                let _ = self.stop();
                Err(RawcamError::platform(format!(
                    "{} pipeline stuck in {state:?} after {STATE_TIMEOUT_SECS}s",
                    self.name
                )))
            }
            (Err(e), _, _) => {
                let detail = self.first_error().unwrap_or_else(|| format!("{e:?}"));
                let _ = self.stop();
                Err(RawcamError::platform(format!(
                    "{} pipeline failed to reach Playing: {detail}",
                    self.name
                )))
            }
        }
    }

    /// Stop the watcher and bring the pipeline down to Null.
    pub fn stop(&mut self) -> RawcamResult<()> {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
        self.pipeline.set_state(gst::State::Null).map_err(|e| {
            RawcamError::platform(format!("Failed to stop {} pipeline: {e:?}", self.name))
        })?;
        self.running = false;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// First error message waiting on the bus, if no watcher consumed it.
    fn first_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        while let Some(msg) = bus.pop() {
            if let gst::MessageView::Error(err) = msg.view() {
                return Some(err.error().to_string());
            }
        }
        None
    }
}

impl Drop for GstPipeline {
    fn drop(&mut self) {
        if self.running || self.watcher.is_some() {
            if let Err(e) = self.stop() {
                tracing::warn!(pipeline = %self.name, error = %e, "Pipeline teardown failed");
            }
        }
    }
}

/// Background thread draining a pipeline bus.
struct BusWatcher {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl BusWatcher {
    fn spawn<F>(name: &str, bus: gst::Bus, mut handler: F) -> RawcamResult<Self>
    where
        F: FnMut(&gst::Message) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = std::thread::Builder::new()
            .name(format!("rawcam-bus-{name}"))
            .spawn(move || {
                while !flag.load(Ordering::SeqCst) {
                    if let Some(msg) = bus.timed_pop(gst::ClockTime::from_mseconds(BUS_POLL_MS)) {
                        handler(&msg);
                    }
                }
            })?;
        Ok(Self { stop, handle })
    }

    fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        if self.handle.join().is_err() {
            tracing::warn!("Bus watcher thread panicked");
        }
    }
}

/// One capture track backed by its own pipeline.
pub struct GstTrack {
    kind: DeviceKind,
    device_id: String,
    pipeline: GstPipeline,
    live: bool,
}

impl GstTrack {
    /// Launch and start a track. Source errors after start are reported on
    /// `events` as [`DisplayEvent::DeviceLost`].
    pub fn open(
        kind: DeviceKind,
        device_id: &str,
        launch: &str,
        events: EventSender,
    ) -> RawcamResult<Self> {
        let name = match kind {
            DeviceKind::VideoInput => "video",
            DeviceKind::AudioInput => "audio",
            DeviceKind::AudioOutput => {
                return Err(RawcamError::unsupported("capture from an output device"))
            }
        };
        let mut pipeline = GstPipeline::from_launch(name, launch)?;
        pipeline.start()?;

        let lost = device_id.to_string();
        pipeline.watch_bus(move |msg| {
            if let gst::MessageView::Error(err) = msg.view() {
                tracing::warn!(
                    device = %lost,
                    error = %err.error(),
                    debug = ?err.debug(),
                    "Capture source failed"
                );
                let _ = events.send(DisplayEvent::DeviceLost {
                    device_id: lost.clone(),
                });
            }
        })?;

        tracing::info!(device = device_id, track = name, "Capture track started");
        Ok(Self {
            kind,
            device_id: device_id.to_string(),
            pipeline,
            live: true,
        })
    }
}

impl MediaTrack for GstTrack {
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
        if let Err(e) = self.pipeline.stop() {
            tracing::warn!(device = %self.device_id, error = %e, "Track did not stop cleanly");
        }
        self.live = false;
    }
}

/// Launch string for a camera track feeding `channel`.
///
/// The ideal size is reached by scaling with borders, never by forcing the
/// camera into a mode it does not offer.
pub fn video_launch(video: &VideoConstraints, channel: &str) -> String {
    let source = match video.device.exact_id() {
        Some(id) => format!("v4l2src device=\"{}\"", quote(id)),
        None => "v4l2src".to_string(),
    };
    let caps = match (video.ideal_width, video.ideal_height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => {
            format!(" ! videoscale add-borders=true ! video/x-raw,width={w},height={h}")
        }
        _ => String::new(),
    };
    format!(
        "{source} ! videoconvert{caps} ! intervideosink channel=\"{}\"",
        quote(channel)
    )
}

/// Launch string for a microphone track feeding `channel`.
///
/// No processing elements are ever inserted; requests for echo
/// cancellation, noise suppression or gain control are ignored.
pub fn audio_launch(audio: &AudioConstraints, channel: &str) -> String {
    if audio.wants_processing() {
        tracing::warn!(?audio, "Audio processing requested; capturing raw audio anyway");
    }
    let source = match audio.device.exact_id() {
        Some(id) => format!("alsasrc device=\"{}\"", quote(id)),
        None => "alsasrc".to_string(),
    };
    format!(
        "{source} ! audioconvert ! audioresample ! interaudiosink channel=\"{}\"",
        quote(channel)
    )
}

/// Launch string for a window rendering `channel`. The video sink is named
/// `videosink`.
pub fn preview_launch(channel: &str) -> String {
    let channel = quote(channel);
    format!(
        "intervideosrc channel=\"{channel}\" ! videoconvert ! autovideosink name=videosink \
         interaudiosrc channel=\"{channel}\" ! audioconvert ! autoaudiosink"
    )
}

pub(crate) fn init_gstreamer() -> RawcamResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    match GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string())) {
        Ok(()) => Ok(()),
        Err(e) => Err(RawcamError::platform(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawcam_platform_core::{CaptureConstraints, MonitorInfo};

    fn display(width: u32, height: u32) -> MonitorInfo {
        MonitorInfo {
            width,
            height,
            ..MonitorInfo::default()
        }
    }

    #[test]
    fn raw_video_pins_device_and_scales_to_display() {
        let c = CaptureConstraints::raw("/dev/video2", "hw:1,0", &display(2560, 1440));
        assert_eq!(
            video_launch(&c.video, "s1"),
            "v4l2src device=\"/dev/video2\" ! videoconvert ! videoscale add-borders=true \
             ! video/x-raw,width=2560,height=1440 ! intervideosink channel=\"s1\""
        );
    }

    #[test]
    fn generic_video_lets_the_camera_choose() {
        let c = CaptureConstraints::generic();
        assert_eq!(
            video_launch(&c.video, "probe"),
            "v4l2src ! videoconvert ! intervideosink channel=\"probe\""
        );
    }

    #[test]
    fn audio_never_adds_processing() {
        let c = CaptureConstraints::raw("/dev/video0", "hw:2,0", &display(1920, 1080));
        let launch = audio_launch(&c.audio, "s1");
        assert!(launch.starts_with("alsasrc device=\"hw:2,0\""));
        assert!(launch.ends_with("interaudiosink channel=\"s1\""));
        for element in ["webrtcdsp", "audiornnoise", "volume"] {
            assert!(!launch.contains(element));
        }
    }

    #[test]
    fn preview_reads_both_channels() {
        let launch = preview_launch("s7");
        assert!(launch.contains("intervideosrc channel=\"s7\""));
        assert!(launch.contains("interaudiosrc channel=\"s7\""));
        assert!(launch.contains("name=videosink"));
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(quote("a\"b"), "a\\\"b");
    }
}
