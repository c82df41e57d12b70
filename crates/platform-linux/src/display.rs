//! Display/monitor detection.
//!
//! Connected outputs are read from `class/drm/card*-*` in sysfs: `status`
//! says whether a monitor is attached and the first line of `modes` is its
//! preferred mode.

use std::path::Path;

use rawcam_common::error::RawcamResult;
use rawcam_platform_core::{DisplayServer, MonitorInfo};

/// Detect connected monitors. The first connected output is treated as
/// primary.
pub fn detect_monitors(sysfs_root: &Path) -> RawcamResult<Vec<MonitorInfo>> {
    tracing::debug!("Detecting monitors");

    let drm_dir = sysfs_root.join("class").join("drm");
    let entries = match std::fs::read_dir(&drm_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut connectors: Vec<_> = entries
        .flatten()
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.starts_with("card") && name.contains('-')
        })
        .map(|e| e.path())
        .collect();
    connectors.sort();

    let mut monitors = Vec::new();
    for path in connectors {
        let status = std::fs::read_to_string(path.join("status")).unwrap_or_default();
        if status.trim() != "connected" {
            continue;
        }
        let modes = std::fs::read_to_string(path.join("modes")).unwrap_or_default();
        let Some((width, height)) = modes.lines().next().and_then(parse_mode) else {
            continue;
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        // "card0-HDMI-A-1" -> "HDMI-A-1"
        let name = name
            .split_once('-')
            .map(|(_, connector)| connector.to_string())
            .unwrap_or(name);

        monitors.push(MonitorInfo {
            name,
            width,
            height,
            x: 0,
            y: 0,
            scale_factor: 1.0,
            primary: monitors.is_empty(),
        });
    }

    Ok(monitors)
}

/// Parse a DRM mode line such as `1920x1080` or `1920x1080i`.
fn parse_mode(line: &str) -> Option<(u32, u32)> {
    let (w, h) = line.trim().split_once('x')?;
    let h: String = h.chars().take_while(|c| c.is_ascii_digit()).collect();
    Some((w.parse().ok()?, h.parse().ok()?))
}

/// Detect the current display server.
pub fn detect_display_server() -> DisplayServer {
    if std::env::var("WAYLAND_DISPLAY").is_ok() {
        DisplayServer::Wayland
    } else if std::env::var("DISPLAY").is_ok() {
        DisplayServer::X11
    } else {
        DisplayServer::Unknown
    }
}
