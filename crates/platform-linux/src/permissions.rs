//! Permission detection and guidance for Linux.
//!
//! Rawcam needs read/write access to the camera's V4L2 node and the
//! microphone's ALSA capture node, plus a graphical session for the
//! full-screen preview.

use std::ffi::CString;
use std::path::Path;

use rawcam_platform_core::{DeviceDescriptor, DeviceKind, DisplayServer};

use crate::display::detect_display_server;
use crate::portal::is_sandboxed;

/// A system capability that Rawcam may need.
#[derive(Debug, Clone)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

/// Check all capabilities against the enumerated devices and report status.
pub fn check_capabilities(devices: &[DeviceDescriptor]) -> Vec<Capability> {
    vec![
        check_video_access(devices),
        check_audio_access(devices),
        check_display_session(),
        check_camera_portal(),
    ]
}

/// Device node backing a descriptor id.
pub fn device_node(descriptor: &DeviceDescriptor) -> Option<String> {
    match descriptor.kind {
        DeviceKind::VideoInput => Some(descriptor.id.clone()),
        DeviceKind::AudioInput => {
            let (card, device) = descriptor.id.strip_prefix("hw:")?.split_once(',')?;
            Some(format!("/dev/snd/pcmC{card}D{device}c"))
        }
        DeviceKind::AudioOutput => None,
    }
}

/// Whether the current user may open `path` for reading and writing.
pub fn node_accessible(path: &str) -> bool {
    let Ok(c_path) = CString::new(path) else {
        return false;
    };
    // SAFETY: `c_path` is a valid NUL-terminated string for the duration of the call.
    unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) == 0 }
}

fn check_video_access(devices: &[DeviceDescriptor]) -> Capability {
    let nodes: Vec<_> = devices
        .iter()
        .filter(|d| d.kind == DeviceKind::VideoInput)
        .filter_map(device_node)
        .collect();
    let available = !nodes.is_empty() && nodes.iter().all(|n| node_accessible(n));

    Capability {
        name: "Camera Access".to_string(),
        description: "Read/write access to V4L2 capture nodes (/dev/video*)".to_string(),
        available,
        required: true,
        fix_instructions: if nodes.is_empty() {
            Some("Connect a camera and verify /dev/video* exists (v4l2-ctl --list-devices)".to_string())
        } else if !available {
            Some("Add user to the video group: sudo usermod -aG video $USER (logout required)".to_string())
        } else {
            None
        },
    }
}

fn check_audio_access(devices: &[DeviceDescriptor]) -> Capability {
    let nodes: Vec<_> = devices
        .iter()
        .filter(|d| d.kind == DeviceKind::AudioInput)
        .filter_map(device_node)
        .collect();
    let available = !nodes.is_empty() && nodes.iter().all(|n| node_accessible(n));

    Capability {
        name: "Microphone Access".to_string(),
        description: "Read/write access to ALSA capture nodes (/dev/snd/pcmC*D*c)".to_string(),
        available,
        required: true,
        fix_instructions: if nodes.is_empty() {
            Some("Connect a microphone and verify it is listed by arecord -l".to_string())
        } else if !available {
            Some("Add user to the audio group: sudo usermod -aG audio $USER (logout required)".to_string())
        } else {
            None
        },
    }
}

fn check_display_session() -> Capability {
    let available = detect_display_server() != DisplayServer::Unknown;

    Capability {
        name: "Display Session".to_string(),
        description: "Graphical session hosting the full-screen preview".to_string(),
        available,
        required: true,
        fix_instructions: if !available {
            Some("Run Rawcam from a Wayland or X11 desktop session".to_string())
        } else {
            None
        },
    }
}

fn check_camera_portal() -> Capability {
    let sandboxed = is_sandboxed();
    let bus_present = std::env::var("DBUS_SESSION_BUS_ADDRESS").is_ok()
        || Path::new("/run/user").exists();

    Capability {
        name: "Camera Portal".to_string(),
        description: "XDG Desktop Portal consent for sandboxed camera access".to_string(),
        available: bus_present,
        required: sandboxed,
        fix_instructions: if sandboxed && !bus_present {
            Some("Install xdg-desktop-portal and run inside a desktop session".to_string())
        } else {
            None
        },
    }
}

/// Print a user-friendly capability report.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("Rawcam System Capabilities:");
    println!("{}", "-".repeat(60));

    for cap in capabilities {
        let status = if cap.available {
            "[OK]"
        } else if cap.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        };

        println!("  {} {}: {}", status, cap.name, cap.description);

        if let Some(ref fix) = cap.fix_instructions {
            println!("    Fix: {fix}");
        }
    }
}
