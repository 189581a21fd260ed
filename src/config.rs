//! Editor configuration: preferences, the custom attribute schema and
//! keybindings, stored as versioned JSON.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DRAG_THROTTLE_MS, DEFAULT_SAVE_STATUS_MS, DEFAULT_ZOOM_STEP};
use crate::keybindings::KeyBindings;
use crate::model::{AttributeSchema, QcMode};

/// Format version written by this build. Files with a higher version are rejected.
pub const CONFIG_VERSION: u32 = 1;

/// File name inside the per-user config directory.
pub const CONFIG_FILENAME: &str = "qcedit-config.json";

/// Verbosity of the `log` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only failures
    Error,
    Warn,
    /// Image loads, saves and config changes
    #[default]
    Info,
    /// Per-interaction detail
    Debug,
    /// Everything, including drag previews
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Root of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Format version, compared against [`CONFIG_VERSION`] on load
    pub version: u32,

    #[serde(default)]
    pub preferences: UserPreferences,

    /// Custom per-object attributes shown in the attribute panel
    #[serde(default)]
    pub attributes: AttributeSchema,

    /// Key that starts creating a new shape
    #[serde(default)]
    pub keybindings: KeyBindings,
}

/// Per-user editor settings. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Default log verbosity; `RUST_LOG` still overrides it
    pub log_level: LogLevel,

    /// Which annotation dialect is reviewed
    pub qc_mode: QcMode,

    /// Minimum interval between drag preview updates
    pub drag_throttle_ms: u64,

    /// Zoom change per wheel notch
    pub zoom_step: f64,

    /// How long the saved/failed indicator stays visible
    pub save_status_ms: u64,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            qc_mode: QcMode::Detection,
            drag_throttle_ms: DEFAULT_DRAG_THROTTLE_MS,
            zoom_step: DEFAULT_ZOOM_STEP,
            save_status_ms: DEFAULT_SAVE_STATUS_MS,
        }
    }
}

impl UserPreferences {
    pub fn log_filter(&self) -> log::LevelFilter {
        self.log_level.into()
    }

    pub fn drag_throttle(&self) -> Duration {
        Duration::from_millis(self.drag_throttle_ms)
    }

    pub fn save_status_duration(&self) -> Duration {
        Duration::from_millis(self.save_status_ms)
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: UserPreferences::default(),
            attributes: AttributeSchema::default(),
            keybindings: KeyBindings::default(),
        }
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                found: config.version,
                supported: CONFIG_VERSION,
            });
        }
        Ok(config)
    }

    /// Read a config file. A missing file is `Ok(None)`.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.is_file() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json).map(Some)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// `<config_dir>/qcedit/qcedit-config.json`, or `~/.config/qcedit/` without a platform config dir.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<PathBuf> {
        let base = dirs::config_dir().or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;
        Some(base.join("qcedit").join(CONFIG_FILENAME))
    }

    /// Config from the default location; problems are logged and yield `None`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        match Self::load_from(&path) {
            Ok(Some(config)) => {
                log::info!("Loaded configuration from {:?}", path);
                Some(config)
            }
            Ok(None) => {
                log::debug!("No config file at {:?}", path);
                None
            }
            Err(e) => {
                log::warn!("Ignoring config file {:?}: {}", path, e);
                None
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors loading or saving the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File is not valid JSON or has the wrong shape
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Configuration version {found} is newer than supported version {supported}")]
    VersionTooNew {
        /// Version in the file
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },

    /// Neither a platform config directory nor a home directory exists
    #[error("Could not determine a config directory")]
    NoConfigDir,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttributeKind;

    #[test]
    fn test_defaults() {
        let config = AppConfig::new();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.preferences.drag_throttle_ms, 16);
        assert_eq!(config.preferences.save_status_ms, 1500);
        assert_eq!(config.preferences.qc_mode, QcMode::Detection);
        assert_eq!(config.keybindings.start_creation, "n");
        assert!(config.attributes.is_empty());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let json = r#"{
            "version": 1,
            "preferences": { "qc_mode": "segmentation", "log_level": "debug" },
            "attributes": [
                { "name": "occluded", "type": "select", "options": ["yes", "no"], "default": "no" },
                { "name": "height", "type": "number", "min": 0 }
            ]
        }"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.preferences.qc_mode, QcMode::Segmentation);
        assert_eq!(config.preferences.log_filter(), log::LevelFilter::Debug);
        assert_eq!(config.preferences.zoom_step, DEFAULT_ZOOM_STEP);
        assert_eq!(config.preferences.drag_throttle_ms, DEFAULT_DRAG_THROTTLE_MS);
        assert_eq!(config.keybindings, KeyBindings::default());

        let defs = config.attributes.defs();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].kind, AttributeKind::Select);
        assert_eq!(defs[1].kind, AttributeKind::Number);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("qcedit-config-{}", std::process::id()));
        let path = dir.join("nested").join(CONFIG_FILENAME);
        assert!(AppConfig::load_from(&path).unwrap().is_none());

        let mut config = AppConfig::new();
        config.preferences.drag_throttle_ms = 32;
        config.keybindings.start_creation = "c".to_string();
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), Some(config));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_newer_version_rejected() {
        let json = format!(r#"{{ "version": {} }}"#, CONFIG_VERSION + 1);
        assert!(matches!(
            AppConfig::from_json(&json),
            Err(ConfigError::VersionTooNew { found: 2, .. })
        ));
    }

    #[test]
    fn test_log_level_names() {
        let prefs: UserPreferences = serde_json::from_str(r#"{ "log_level": "warn" }"#).unwrap();
        assert_eq!(prefs.log_level, LogLevel::Warn);
        assert_eq!(log::LevelFilter::from(LogLevel::Trace), log::LevelFilter::Trace);
    }
}
