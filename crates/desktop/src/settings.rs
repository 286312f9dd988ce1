use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use perception_core::shared::constants::{
    DEFAULT_CONFIDENCE, DEFAULT_DEVICE, DEFAULT_IOU_THRESHOLD, DEFAULT_LINE_THICKNESS,
    DEFAULT_MODEL_NAME, DEFAULT_REFRESH_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    Dark,
    Light,
}

impl std::fmt::Display for Appearance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Appearance::Dark => write!(f, "Dark"),
            Appearance::Light => write!(f, "Light"),
        }
    }
}

/// Viewer preferences persisted as JSON in the user's config directory.
///
/// Missing keys fall back to their defaults, so older files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: String,
    pub video_size: Option<String>,
    pub model_path: Option<PathBuf>,
    pub model_name: String,
    pub model_url: Option<String>,
    pub confidence: f32,
    pub iou_threshold: f32,
    pub line_thickness: u32,
    pub refresh_ms: u64,
    pub appearance: Appearance,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            video_size: None,
            model_path: None,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_url: None,
            confidence: DEFAULT_CONFIDENCE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            line_thickness: DEFAULT_LINE_THICKNESS,
            refresh_ms: DEFAULT_REFRESH_MS,
            appearance: Appearance::Dark,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("PerceptionViewer").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Reads settings from `path`, using defaults if it is missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Err(e) = self.save_to(&path) {
                log::warn!("Could not save settings to {}: {e}", path.display());
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}
