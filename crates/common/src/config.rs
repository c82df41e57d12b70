//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
///
/// Holds tunables only. The device selection is deliberately absent:
/// nothing about a capture session survives a restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture session behaviour.
    pub session: SessionDefaults,

    /// Platform integration settings.
    pub platform: PlatformConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Capture session tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
    /// How long to wait for the display sink to confirm it is mounted
    /// before giving up on the full-screen request.
    pub sink_mount_timeout_ms: u64,

    /// Ask the compositor to hide navigation affordances in full-screen.
    pub hide_navigation: bool,

    /// Force a stop when a device of the active group disappears.
    pub stop_on_device_loss: bool,
}

/// Platform integration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Root of the sysfs tree used for device enumeration.
    pub sysfs_root: PathBuf,

    /// Whether to ask the xdg camera portal for access.
    pub camera_portal: PortalMode,
}

/// When the camera portal should be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PortalMode {
    /// Only inside a Flatpak sandbox.
    #[default]
    Auto,
    Always,
    Never,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "rawcam=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            sink_mount_timeout_ms: 5_000,
            hide_navigation: true,
            stop_on_device_loss: true,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys"),
            camera_portal: PortalMode::Auto,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("rawcam").join("config.json")
}
