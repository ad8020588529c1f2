//! Run configuration for rawtodepth-rs
//!
//! A run is configured from three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, or `config.toml` in the app config directory)
//! 3. Command-line flags
//!
//! # Config Location
//!
//! - **Linux**: `~/.config/dev.rawtodepth-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.rawtodepth-rs/config.toml`
//! - **Windows**: `%APPDATA%\dev.rawtodepth-rs\config.toml`
//!
//! # Example
//!
//! ```toml
//! output = "session_depth.mkv"
//!
//! [logging]
//! level = "debug"
//! log_file = "reprocess.log"
//!
//! [attachments]
//! depth_calibration = "depth_cal.ccb"
//! calibration = "calibration.json"
//!
//! [engine]
//! frame_period_ticks = 6000
//! ```

use crate::engine::DEFAULT_FRAME_PERIOD_TICKS;
use crate::error::{RawToDepthError, Result};
use crate::pipeline::ReprocessOptions;
use crate::session::{CALIBRATION_ATTACHMENT, DEPTH_CALIBRATION_ATTACHMENT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.rawtodepth-rs";

/// Config filename inside the app config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Output archive written when none is given
pub const DEFAULT_OUTPUT_FILE: &str = "out_depth.mkv";

/// Log filter used when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "info,rawtodepth_rs=debug";

/// Get the application config directory path
pub fn app_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    app_config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub level: String,
    /// Mirror logs to this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_FILTER.to_string(),
            log_file: None,
        }
    }
}

/// Attachment names read from the input and written to the output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    pub depth_calibration: String,
    pub calibration: String,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            depth_calibration: DEPTH_CALIBRATION_ATTACHMENT.to_string(),
            calibration: CALIBRATION_ATTACHMENT.to_string(),
        }
    }
}

/// Simulated engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tick distance between consecutive exposures
    pub frame_period_ticks: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_period_ticks: DEFAULT_FRAME_PERIOD_TICKS,
        }
    }
}

/// Complete configuration of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Raw input archive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
    /// Output archive
    pub output: PathBuf,
    pub logging: LoggingConfig,
    pub attachments: AttachmentConfig,
    pub engine: EngineConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            logging: LoggingConfig::default(),
            attachments: AttachmentConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RawToDepthError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            RawToDepthError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load the config from the default location, if there is one
    ///
    /// A missing file yields defaults; an unreadable or malformed file is an
    /// error.
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Loading config from {:?}", path);
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Save the config as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    RawToDepthError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| RawToDepthError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            RawToDepthError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// The input archive, which has no default
    pub fn input_path(&self) -> Result<&Path> {
        self.input
            .as_deref()
            .ok_or_else(|| RawToDepthError::Config("no input archive given".to_string()))
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.input_path()?;
        if self.output.as_os_str().is_empty() {
            return Err(RawToDepthError::Config("output path is empty".to_string()));
        }
        if self.engine.frame_period_ticks == 0 {
            return Err(RawToDepthError::Config(
                "engine.frame_period_ticks must be positive".to_string(),
            ));
        }
        if self.attachments.depth_calibration.is_empty() || self.attachments.calibration.is_empty()
        {
            return Err(RawToDepthError::Config(
                "attachment names must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Attachment names for the orchestrator
    pub fn reprocess_options(&self) -> ReprocessOptions {
        ReprocessOptions {
            depth_calibration_attachment: self.attachments.depth_calibration.clone(),
            calibration_attachment: self.attachments.calibration.clone(),
        }
    }
}
