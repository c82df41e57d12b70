//! Acquired media streams and their tracks.

use rawcam_platform_core::DeviceKind;

/// One live capture track (a camera or a microphone).
pub trait MediaTrack: Send {
    fn kind(&self) -> DeviceKind;

    /// Id of the device feeding this track.
    fn device_id(&self) -> &str;

    /// Whether the track still holds its device.
    fn is_live(&self) -> bool;

    /// Release the device. After this `is_live` must return false.
    fn stop(&mut self);
}

/// A set of tracks acquired together.
///
/// Dropping a stream releases any track that is still live, so a stream
/// abandoned halfway through an operation never keeps hardware open.
pub struct MediaStream {
    id: String,
    tracks: Vec<Box<dyn MediaTrack>>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[Box<dyn MediaTrack>] {
        &self.tracks
    }

    /// Number of tracks still holding a device.
    pub fn live_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    /// Whether any track (live or not) was opened on `device_id`.
    pub fn uses_device(&self, device_id: &str) -> bool {
        self.tracks.iter().any(|t| t.device_id() == device_id)
    }

    /// Stop every live track once. Returns how many tracks were stopped.
    pub fn stop_all(&mut self) -> usize {
        let mut stopped = 0;
        for track in self.tracks.iter_mut().filter(|t| t.is_live()) {
            tracing::debug!(
                stream = %self.id,
                kind = ?track.kind(),
                device = track.device_id(),
                "Stopping track"
            );
            track.stop();
            stopped += 1;
        }
        stopped
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("tracks", &self.tracks.len())
            .field("live", &self.live_tracks())
            .finish()
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        let stopped = self.stop_all();
        if stopped > 0 {
            tracing::warn!(stream = %self.id, stopped, "Stream dropped with live tracks");
        }
    }
}
