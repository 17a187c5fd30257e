//! Host configuration
//!
//! Stored as TOML. Every field has a default so partial files load.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GuiError, GuiResult};

const DEFAULT_TITLE: &str = "Config GUI";
const DEFAULT_SIZE: (u32, u32) = (1280, 800);

/// Viewport the toolkit opens at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Whether the viewport has OS decorations (title bar, borders)
    pub decorated: bool,
    /// Whether windows can be docked into the viewport
    pub docking: bool,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            width: DEFAULT_SIZE.0,
            height: DEFAULT_SIZE.1,
            decorated: true,
            docking: true,
        }
    }
}

impl ViewportSettings {
    /// Create settings with a title
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the viewport size
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Show or hide the window decorations
    #[must_use]
    pub fn with_decorated(mut self, decorated: bool) -> Self {
        self.decorated = decorated;
        self
    }
}

/// Configuration for a [`GuiHost`](crate::host::GuiHost)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub viewport: ViewportSettings,
    /// Stop the frame loop after this many frames
    pub max_frames: Option<u64>,
}

impl HostConfig {
    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> GuiResult<Self> {
        toml::from_str(content).map_err(|e| GuiError::Config(e.to_string()))
    }

    /// Serialize to TOML text
    pub fn to_toml_string(&self) -> GuiResult<String> {
        toml::to_string_pretty(self).map_err(|e| GuiError::Config(e.to_string()))
    }

    /// Load configuration from disk
    pub fn load(path: &Path) -> GuiResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to disk, creating parent directories
    pub fn save(&self, path: &Path) -> GuiResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Stop the frame loop after `frames` frames
    #[must_use]
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.viewport.title, "Config GUI");
        assert!(config.viewport.decorated);
        assert!(config.viewport.docking);
        assert_eq!(config.max_frames, None);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = HostConfig::from_toml_str(
            r#"
            max_frames = 30

            [viewport]
            title = "Settings"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_frames, Some(30));
        assert_eq!(config.viewport.title, "Settings");
        assert_eq!(config.viewport.width, DEFAULT_SIZE.0);
        assert!(config.viewport.docking);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = HostConfig::from_toml_str("max_frames = \"soon\"");
        assert!(matches!(result, Err(GuiError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("host.toml");

        let config = HostConfig {
            viewport: ViewportSettings::new("Demo").with_size(640, 480).with_decorated(false),
            max_frames: Some(5),
        };
        config.save(&path).unwrap();

        assert_eq!(HostConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = HostConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(GuiError::Io(_))));
    }
}
