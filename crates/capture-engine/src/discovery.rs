//! Device discovery: turns raw descriptors into camera+microphone pairs.

use std::collections::HashMap;
use std::sync::Arc;

use rawcam_common::error::{RawcamError, RawcamResult};
use rawcam_platform_core::{labels_available, CaptureConstraints, DeviceDescriptor, DeviceKind};
use serde::Serialize;

use crate::backend::CaptureBackend;

/// Label used when the camera reports no name.
pub const FALLBACK_LABEL: &str = "Unknown Capture Device";

/// A physically bundled camera and microphone.
///
/// Only complete pairs exist as values of this type; hardware units that
/// expose just one of the two never become a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceGroup {
    pub group_id: String,
    pub video: DeviceDescriptor,
    pub audio: DeviceDescriptor,
    pub label: String,
}

/// Pair descriptors by `group_id`, keeping the first camera and the first
/// microphone of each group. Groups are returned in the order their id was
/// first encountered; groups missing either kind are dropped.
pub fn pair_devices(descriptors: &[DeviceDescriptor]) -> Vec<DeviceGroup> {
    #[derive(Default)]
    struct Partial<'a> {
        video: Option<&'a DeviceDescriptor>,
        audio: Option<&'a DeviceDescriptor>,
    }

    let mut order: Vec<&str> = Vec::new();
    let mut partials: HashMap<&str, Partial<'_>> = HashMap::new();

    for descriptor in descriptors {
        let partial = partials
            .entry(descriptor.group_id.as_str())
            .or_insert_with(|| {
                order.push(descriptor.group_id.as_str());
                Partial::default()
            });
        match descriptor.kind {
            DeviceKind::VideoInput if partial.video.is_none() => partial.video = Some(descriptor),
            DeviceKind::AudioInput if partial.audio.is_none() => partial.audio = Some(descriptor),
            _ => {}
        }
    }

    order
        .into_iter()
        .filter_map(|group_id| {
            let partial = partials.remove(group_id)?;
            let (video, audio) = (partial.video?, partial.audio?);
            let label = if video.has_label() {
                video.label.clone()
            } else {
                FALLBACK_LABEL.to_string()
            };
            Some(DeviceGroup {
                group_id: group_id.to_string(),
                video: video.clone(),
                audio: audio.clone(),
                label,
            })
        })
        .collect()
}

/// Enumerates devices through a backend and derives paired groups.
pub struct DeviceDiscovery {
    backend: Arc<dyn CaptureBackend>,
}

impl DeviceDiscovery {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self { backend }
    }

    /// Run one discovery pass.
    ///
    /// Platforms withhold device labels until capture permission has been
    /// granted once. When no descriptor carries a label, a throwaway generic
    /// stream is opened to trigger the permission prompt, all its tracks are
    /// stopped, and devices are enumerated again.
    pub async fn discover(&self) -> RawcamResult<Vec<DeviceGroup>> {
        let mut descriptors = self
            .backend
            .enumerate_devices()
            .await
            .map_err(RawcamError::into_discovery)?;

        if !labels_available(&descriptors) {
            tracing::info!(
                devices = descriptors.len(),
                "Device labels withheld; probing for capture permission"
            );
            self.probe_permission().await?;
            descriptors = self
                .backend
                .enumerate_devices()
                .await
                .map_err(RawcamError::into_discovery)?;
        }

        let groups = pair_devices(&descriptors);
        tracing::info!(
            devices = descriptors.len(),
            groups = groups.len(),
            "Device discovery complete"
        );
        for group in &groups {
            tracing::debug!(
                group = %group.group_id,
                label = %group.label,
                video = %group.video.id,
                audio = %group.audio.id,
                "Discovered capture group"
            );
        }
        Ok(groups)
    }

    async fn probe_permission(&self) -> RawcamResult<()> {
        let mut probe = self
            .backend
            .acquire_stream(&CaptureConstraints::generic())
            .await
            .map_err(RawcamError::into_discovery)?;
        let stopped = probe.stop_all();
        tracing::debug!(stream = %probe.id(), stopped, "Permission probe released");
        Ok(())
    }
}
