use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rawcam_common::config::{PlatformConfig, PortalMode};
use rawcam_common::error::{RawcamError, RawcamResult};
use rawcam_platform_core::{
    primary_monitor, CaptureConstraints, DeviceDescriptor, DeviceKind, MonitorInfo,
};
use rawcam_platform_linux::permissions::{device_node, node_accessible};
use rawcam_platform_linux::portal::{portal_wanted, request_camera_access};
use rawcam_platform_linux::{detect_monitors, enumerate_devices};

use crate::backend::{CaptureBackend, EventSender};
use crate::pipeline::{audio_launch, video_launch, GstTrack};
use crate::stream::{MediaStream, MediaTrack};

/// V4L2 + ALSA capture through GStreamer, devices discovered from sysfs.
pub struct LinuxBackend {
    sysfs_root: PathBuf,
    portal: PortalMode,
    portal_granted: AtomicBool,
    events: EventSender,
    next_stream: AtomicU64,
}

impl LinuxBackend {
    /// `events` receives [`rawcam_platform_core::DisplayEvent::DeviceLost`]
    /// when a capture source fails mid-stream.
    pub fn new(config: &PlatformConfig, events: EventSender) -> Self {
        Self {
            sysfs_root: config.sysfs_root.clone(),
            portal: config.camera_portal,
            portal_granted: AtomicBool::new(false),
            events,
            next_stream: AtomicU64::new(1),
        }
    }

    async fn ensure_portal_access(&self) -> RawcamResult<()> {
        if !portal_wanted(self.portal) || self.portal_granted.load(Ordering::SeqCst) {
            return Ok(());
        }
        request_camera_access().await?;
        self.portal_granted.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait::async_trait]
impl CaptureBackend for LinuxBackend {
    async fn enumerate_devices(&self) -> RawcamResult<Vec<DeviceDescriptor>> {
        self.ensure_portal_access().await?;
        let mut devices = enumerate_devices(&self.sysfs_root)?;
        withhold_inaccessible_labels(&mut devices);
        tracing::debug!(
            root = %self.sysfs_root.display(),
            devices = devices.len(),
            "Enumerated Linux capture devices"
        );
        Ok(devices)
    }

    async fn acquire_stream(&self, constraints: &CaptureConstraints) -> RawcamResult<MediaStream> {
        self.ensure_portal_access().await?;

        let stream_id = format!(
            "rawcam-{}",
            self.next_stream.fetch_add(1, Ordering::SeqCst)
        );
        let constraints = constraints.clone();
        let events = self.events.clone();
        tokio::task::spawn_blocking(move || open_stream(stream_id, &constraints, events))
            .await
            .map_err(|e| RawcamError::platform(format!("capture worker failed: {e}")))?
    }

    fn primary_display(&self) -> RawcamResult<MonitorInfo> {
        let monitors = detect_monitors(&self.sysfs_root)?;
        if monitors.is_empty() {
            return Err(RawcamError::platform("no connected display found"));
        }
        Ok(primary_monitor(&monitors))
    }
}

/// Start the video track, then the audio track. A failure drops (and so
/// stops) whatever already started.
fn open_stream(
    stream_id: String,
    constraints: &CaptureConstraints,
    events: EventSender,
) -> RawcamResult<MediaStream> {
    let video_id = constraints
        .video
        .device
        .exact_id()
        .unwrap_or("default camera")
        .to_string();
    let audio_id = constraints
        .audio
        .device
        .exact_id()
        .unwrap_or("default")
        .to_string();

    let video = GstTrack::open(
        DeviceKind::VideoInput,
        &video_id,
        &video_launch(&constraints.video, &stream_id),
        events.clone(),
    )?;
    let audio = GstTrack::open(
        DeviceKind::AudioInput,
        &audio_id,
        &audio_launch(&constraints.audio, &stream_id),
        events,
    )?;

    let tracks: Vec<Box<dyn MediaTrack>> = vec![Box::new(video), Box::new(audio)];
    Ok(MediaStream::new(stream_id, tracks))
}

/// Names of devices the user cannot open are not disclosed, so that
/// discovery falls back to a permission probe.
fn withhold_inaccessible_labels(devices: &mut [DeviceDescriptor]) {
    for device in devices.iter_mut().filter(|d| d.kind.is_input()) {
        let accessible = device_node(device)
            .map(|node| node_accessible(&node))
            .unwrap_or(true);
        if !accessible && !device.label.is_empty() {
            tracing::debug!(device = %device.id, "Device node not accessible; label withheld");
            device.label.clear();
        }
    }
}
