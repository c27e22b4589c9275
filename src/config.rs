// SPDX-License-Identifier: GPL-3.0-only

//! User configuration

use crate::constants::{DEFAULT_JPEG_QUALITY, virtual_sensor};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Output format for persisted pictures
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum PictureFormat {
    #[default]
    Jpeg,
    Png,
}

impl PictureFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            PictureFormat::Jpeg => "jpg",
            PictureFormat::Png => "png",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preferred identifier for the main device (first enumerated if unset)
    pub main_camera_id: Option<String>,
    /// Preferred identifier for the aux device (last enumerated if unset)
    pub aux_camera_id: Option<String>,
    /// Picture output format
    pub picture_format: PictureFormat,
    /// JPEG quality used when a picture has to be re-encoded
    pub jpeg_quality: u8,
    /// Output directory for pictures
    pub photo_dir: Option<PathBuf>,
    /// Delay before touch focus reverts to continuous autofocus
    pub focus_reset_delay_ms: u64,
    /// Preview rate of the virtual platform
    pub preview_fps: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main_camera_id: None,
            aux_camera_id: None,
            picture_format: PictureFormat::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            photo_dir: None,
            focus_reset_delay_ms: crate::constants::DEFAULT_FOCUS_RESET_DELAY.as_millis() as u64,
            preview_fps: virtual_sensor::DEFAULT_PREVIEW_FPS,
        }
    }
}

impl Config {
    /// Default location: `<config_dir>/dualcam/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dualcam").join("config.json"))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            debug!("No config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Directory where pictures are written
    pub fn photo_directory(&self) -> PathBuf {
        if let Some(dir) = &self.photo_dir {
            return dir.clone();
        }
        dirs::picture_dir()
            .map(|dir| dir.join("dualcam"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn focus_reset_delay(&self) -> Duration {
        Duration::from_millis(self.focus_reset_delay_ms)
    }
}
