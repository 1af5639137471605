use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::library::ExportFormat;
use crate::library::authorization::AuthorizationStatus;
use crate::processing::pipeline::RenderBackend;

pub const RENDER_BACKEND_ENV: &str = "PHOTO_FILTER_RENDER_BACKEND";
pub const LIBRARY_ENV: &str = "PHOTO_FILTER_LIBRARY";

const DEFAULT_PREVIEW_WIDTH: f32 = 640.0;
const DEFAULT_PREVIEW_HEIGHT: f32 = 480.0;
const DEFAULT_JPG_QUALITY: u8 = 92;

#[derive(Debug, Default, Serialize, Deserialize)]
/// Persisted UI/application settings for Photo Filter.
pub struct AppConfig {
    pub window_width: Option<f32>,
    pub window_height: Option<f32>,
    pub library_path: Option<PathBuf>,
    pub render_backend: Option<String>,
    pub export_format: Option<String>,
    pub jpg_quality: Option<u8>,
    pub preview_width: Option<f32>,
    pub preview_height: Option<f32>,
    pub library_access: Option<AuthorizationStatus>,
}

impl AppConfig {
    /// Returns the user config file path, if a config directory is available.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("photo-filter").join("config.toml"))
    }

    /// Loads config from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        toml::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), %err, "ignoring unreadable config");
            Self::default()
        })
    }

    /// Writes config to `path`, ignoring filesystem/serialization errors.
    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(s) = toml::to_string_pretty(self) {
            let _ = std::fs::write(path, s);
        }
    }

    /// Library directory: env override, then config, then the user's Pictures.
    pub fn library_root(&self) -> PathBuf {
        if let Ok(raw) = std::env::var(LIBRARY_ENV) {
            if !raw.trim().is_empty() {
                return PathBuf::from(raw);
            }
        }
        self.library_path
            .clone()
            .or_else(dirs::picture_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn render_backend(&self) -> RenderBackend {
        if let Ok(raw) = std::env::var(RENDER_BACKEND_ENV) {
            return RenderBackend::parse(&raw);
        }
        self.render_backend
            .as_deref()
            .map(RenderBackend::parse)
            .unwrap_or(RenderBackend::Auto)
    }

    pub fn export_format(&self) -> ExportFormat {
        self.export_format
            .as_deref()
            .map(ExportFormat::parse)
            .unwrap_or(ExportFormat::Jpg)
    }

    pub fn jpg_quality(&self) -> u8 {
        self.jpg_quality.unwrap_or(DEFAULT_JPG_QUALITY).clamp(1, 100)
    }

    pub fn preview_size(&self) -> (f32, f32) {
        (
            self.preview_width
                .filter(|w| *w > 0.0)
                .unwrap_or(DEFAULT_PREVIEW_WIDTH),
            self.preview_height
                .filter(|h| *h > 0.0)
                .unwrap_or(DEFAULT_PREVIEW_HEIGHT),
        )
    }

    pub fn library_access(&self) -> AuthorizationStatus {
        self.library_access.unwrap_or(AuthorizationStatus::Unknown)
    }
}
