//! Persisted stream settings.
//!
//! The connection form's last values live in a small JSON file; CLI flags
//! override individual fields. A missing or corrupt file falls back to
//! defaults rather than failing the run.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::encode::DEFAULT_QUALITY;
use crate::transport::SessionEndpoint;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Receiver host or IP address.
    pub host: String,
    /// Receiver port.
    pub port: u16,
    /// Session name (path component of the connection URL).
    pub name: String,
    /// JPEG quality, 1-100.
    pub quality: u8,
    /// Capture width in pixels.
    pub width: u32,
    /// Capture height in pixels.
    pub height: u32,
    /// Capture rate in frames per second.
    pub frame_rate: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            name: "stream".to_string(),
            quality: DEFAULT_QUALITY,
            width: 640,
            height: 480,
            frame_rate: 30,
        }
    }
}

impl Settings {
    /// The endpoint these settings point at.
    pub fn endpoint(&self) -> SessionEndpoint {
        SessionEndpoint::new(self.host.clone(), self.port, self.name.clone())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse settings at {}", path.display()))
    }

    /// Load settings, falling back to defaults if the file is missing or
    /// unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable settings file");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write settings to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.quality, DEFAULT_QUALITY);
        assert_eq!(settings.endpoint().url(), "ws://127.0.0.1:8080/stream");
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = Settings {
            host: "10.0.0.5".to_string(),
            port: 9001,
            name: "garage-cam".to_string(),
            quality: 65,
            width: 320,
            height: 240,
            frame_rate: 15,
        };
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert_eq!(Settings::load_or_default(&path), Settings::default());
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json {").unwrap();
        assert_eq!(Settings::load_or_default(&path), Settings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"host": "10.1.1.1", "quality": 50}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.host, "10.1.1.1");
        assert_eq!(settings.quality, 50);
        assert_eq!(settings.port, 8080);
    }
}
