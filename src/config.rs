// =============================================================================
// CONFIGURATION - Load layer settings from stereo_capture_layer.toml
// =============================================================================
//
// The layer is loaded into someone else's process, so a missing or broken
// config file must never stop it: every section falls back to defaults.

use anyhow::{Context, Result};
use ash::vk;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "STEREO_CAPTURE_LAYER_CONFIG";

/// Config file looked up in the working directory when the variable is unset
pub const DEFAULT_CONFIG_FILE: &str = "stereo_capture_layer.toml";

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LayerConfig {
    pub capture: CaptureConfig,
    pub logging: LoggingConfig,
}

/// Capture settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Images narrower than this are never capture candidates
    pub min_width: u32,
    /// Images shorter than this are never capture candidates
    pub min_height: u32,
    /// Start in flat 2D mode (3D color clears are left alone)
    pub force_flat_2d: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            min_width: 1280,
            min_height: 720,
            force_flat_2d: false,
        }
    }
}

impl CaptureConfig {
    pub fn min_extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.min_width,
            height: self.min_height,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_to_file: bool,
    pub log_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: "stereo_capture_layer.log".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Get the level as a `log` filter
    pub fn level_filter(&self) -> log::LevelFilter {
        match self.level.to_lowercase().as_str() {
            "off" => log::LevelFilter::Off,
            "error" => log::LevelFilter::Error,
            "warn" => log::LevelFilter::Warn,
            "info" => log::LevelFilter::Info,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            _ => {
                log::warn!("Unknown log level '{}', defaulting to info", self.level);
                log::LevelFilter::Info
            }
        }
    }
}

impl LayerConfig {
    /// Load configuration from the configured path, falling back to defaults
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Self::load_from_path(&path).unwrap_or_else(|e| {
            log::warn!("Failed to load {:?}: {:#}. Using defaults.", path, e);
            LayerConfig::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(LayerConfig::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
