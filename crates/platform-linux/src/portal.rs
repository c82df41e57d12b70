//! XDG camera portal integration.
//!
//! Inside a Flatpak sandbox the camera is only reachable after the user has
//! consented through `org.freedesktop.portal.Camera`. Outside a sandbox the
//! portal is not needed; device node permissions decide access.

use ashpd::desktop::camera::Camera;
use rawcam_common::config::PortalMode;
use rawcam_common::error::{RawcamError, RawcamResult};

/// Whether the process runs inside a Flatpak sandbox.
pub fn is_sandboxed() -> bool {
    std::path::Path::new("/.flatpak-info").exists()
}

/// Whether the camera portal should be consulted under the given mode.
pub fn portal_wanted(mode: PortalMode) -> bool {
    match mode {
        PortalMode::Always => true,
        PortalMode::Never => false,
        PortalMode::Auto => is_sandboxed(),
    }
}

/// Ask the camera portal for access. Suspends until the user answers the
/// consent dialog.
pub async fn request_camera_access() -> RawcamResult<()> {
    tracing::info!("Requesting camera access through the XDG portal");

    let camera = Camera::new()
        .await
        .map_err(|e| RawcamError::platform(format!("camera portal unavailable: {e}")))?;

    let present = camera
        .is_present()
        .await
        .map_err(|e| RawcamError::platform(format!("camera portal query failed: {e}")))?;
    if !present {
        tracing::warn!("Camera portal reports no camera present");
    }

    camera
        .request_access()
        .await
        .and_then(|request| request.response())
        .map_err(|e| RawcamError::permission_denied(format!("camera access refused: {e}")))?;

    tracing::info!("Camera portal granted access");
    Ok(())
}
