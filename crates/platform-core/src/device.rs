//! Raw capture device descriptors as reported by the platform.

use serde::{Deserialize, Serialize};

/// Kind of media device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

impl DeviceKind {
    pub fn is_input(&self) -> bool {
        matches!(self, DeviceKind::VideoInput | DeviceKind::AudioInput)
    }
}

/// A device exactly as the platform enumerates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Opaque id, stable for the lifetime of the process.
    pub id: String,
    pub kind: DeviceKind,
    /// Key shared by devices that live in the same hardware unit.
    pub group_id: String,
    /// Human readable name; empty while the platform withholds labels.
    pub label: String,
}

impl DeviceDescriptor {
    pub fn new(
        id: impl Into<String>,
        kind: DeviceKind,
        group_id: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            group_id: group_id.into(),
            label: label.into(),
        }
    }

    pub fn has_label(&self) -> bool {
        !self.label.is_empty()
    }
}

/// Whether the platform has released device labels, which only happens
/// after capture permission was granted at least once.
pub fn labels_available(descriptors: &[DeviceDescriptor]) -> bool {
    descriptors.iter().any(DeviceDescriptor::has_label)
}
