//! Capture device enumeration from sysfs.
//!
//! Video nodes come from `class/video4linux`, microphones from the capture
//! PCMs of each ALSA card under `class/sound`. Devices are grouped by the USB
//! device that owns them: a webcam's `videoN` node and its `cardN` both hang
//! off interfaces (`1-2:1.0`, `1-2:1.3`) of the same USB device (`1-2`).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rawcam_common::error::{RawcamError, RawcamResult};
use rawcam_platform_core::{DeviceDescriptor, DeviceKind};

/// Enumerate capture devices below `sysfs_root` (normally `/sys`).
///
/// Order is stable: video nodes by index, then ALSA PCMs by card and device.
pub fn enumerate_devices(sysfs_root: &Path) -> RawcamResult<Vec<DeviceDescriptor>> {
    let root = sysfs_root
        .canonicalize()
        .map_err(|e| map_io(e, sysfs_root))?;

    let mut devices = enumerate_video(&root)?;
    devices.extend(enumerate_sound(&root)?);

    tracing::debug!(count = devices.len(), root = %root.display(), "Enumerated sysfs devices");
    Ok(devices)
}

fn enumerate_video(root: &Path) -> RawcamResult<Vec<DeviceDescriptor>> {
    let class_dir = root.join("class").join("video4linux");
    let mut nodes = numbered_entries(&class_dir, "video")?;
    nodes.sort_by_key(|(n, _)| *n);

    let mut devices = Vec::new();
    for (n, path) in nodes {
        // UVC cameras expose a second metadata node with index 1.
        if let Some(index) = read_attr(&path.join("index")) {
            if index != "0" {
                tracing::trace!(node = n, index = %index, "Skipping non-capture video node");
                continue;
            }
        }

        devices.push(DeviceDescriptor::new(
            format!("/dev/video{n}"),
            DeviceKind::VideoInput,
            group_id(root, &path),
            read_attr(&path.join("name")).unwrap_or_default(),
        ));
    }
    Ok(devices)
}

fn enumerate_sound(root: &Path) -> RawcamResult<Vec<DeviceDescriptor>> {
    let class_dir = root.join("class").join("sound");
    let mut cards = numbered_entries(&class_dir, "card")?;
    cards.sort_by_key(|(n, _)| *n);

    let mut devices = Vec::new();
    for (card, card_path) in cards {
        let group = group_id(root, &card_path);
        let card_label = read_attr(&card_path.join("id")).unwrap_or_default();

        let mut pcms = pcm_entries(&class_dir, card)?;
        pcms.sort();

        for (device, capture) in pcms {
            let kind = if capture {
                DeviceKind::AudioInput
            } else {
                DeviceKind::AudioOutput
            };
            let label = if device == 0 || card_label.is_empty() {
                card_label.clone()
            } else {
                format!("{card_label} ({device})")
            };
            devices.push(DeviceDescriptor::new(
                format!("hw:{card},{device}"),
                kind,
                group.clone(),
                label,
            ));
        }
    }
    Ok(devices)
}

/// Entries of `dir` named `<prefix><number>`. A missing directory means the
/// subsystem is absent and yields nothing.
fn numbered_entries(dir: &Path, prefix: &str) -> RawcamResult<Vec<(u32, PathBuf)>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(map_io(e, dir)),
    };

    let mut out = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(n) = name.strip_prefix(prefix).and_then(|s| s.parse().ok()) {
            out.push((n, entry.path()));
        }
    }
    Ok(out)
}

/// `(device, is_capture)` for every `pcmC<card>D<device>[c|p]` entry.
fn pcm_entries(class_dir: &Path, card: u32) -> RawcamResult<Vec<(u32, bool)>> {
    let prefix = format!("pcmC{card}D");
    let mut out = Vec::new();
    let entries = match std::fs::read_dir(class_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(map_io(e, class_dir)),
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(rest) = name.to_str().and_then(|n| n.strip_prefix(&prefix)) else {
            continue;
        };
        let (digits, direction) = rest.split_at(rest.len().saturating_sub(1));
        let Ok(device) = digits.parse() else {
            continue;
        };
        match direction {
            "c" => out.push((device, true)),
            "p" => out.push((device, false)),
            _ => {}
        }
    }
    Ok(out)
}

/// Hardware grouping key for a class entry: the sysfs path of the USB device
/// owning the interface the node is bound to, relative to the sysfs root.
fn group_id(root: &Path, class_entry: &Path) -> String {
    let Ok(device) = class_entry.join("device").canonicalize() else {
        // Virtual devices (v4l2loopback, snd-dummy) have no parent.
        return relative(root, class_entry);
    };

    let is_usb_interface = device.join("bInterfaceNumber").exists();

    match device.parent() {
        Some(parent) if is_usb_interface => relative(root, parent),
        _ => relative(root, &device),
    }
}

fn relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    format!("/{}", rel.display())
}

/// Read a sysfs attribute. Unreadable attributes (permission withheld)
/// read as `None`.
fn read_attr(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
}

fn map_io(err: std::io::Error, path: &Path) -> RawcamError {
    match err.kind() {
        ErrorKind::PermissionDenied => {
            RawcamError::permission_denied(format!("cannot read {}", path.display()))
        }
        _ => RawcamError::platform(format!("cannot enumerate {}: {err}", path.display())),
    }
}
