use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::report::Severity;

/// Top-level layer configuration, loaded from drawstate.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrawStateConfig {
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Severities that reach the default sink
    #[serde(default = "default_flags")]
    pub flags: Vec<Severity>,
    /// What the default sink does with a report
    #[serde(default)]
    pub action: DebugAction,
    /// Write logs here instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Keep a ring of the most recently touched command buffers
    #[serde(default)]
    pub track_recent_command_buffers: bool,
    /// Size of that ring
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
    /// Trace a command buffer's log when recording ends
    #[serde(default)]
    pub dump_command_buffers: bool,
    /// Trace bound descriptor state at each draw
    #[serde(default)]
    pub dump_descriptor_state: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebugAction {
    #[serde(rename = "ignore")]
    Ignore,
    #[default]
    #[serde(rename = "log")]
    Log,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            flags: default_flags(),
            action: DebugAction::default(),
            log_file: None,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            track_recent_command_buffers: false,
            recent_capacity: default_recent_capacity(),
            dump_command_buffers: false,
            dump_descriptor_state: false,
        }
    }
}

impl DrawStateConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: DrawStateConfig =
            toml::from_str(&content).map_err(|source| CoreError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file if it exists, otherwise return defaults.
    ///
    /// A file that exists but does not parse is logged and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Load from the platform search path (see `drawstate_common::platform`).
    pub fn discover() -> Self {
        Self::load_or_default(&drawstate_common::platform::default_config_path())
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.debug.track_recent_command_buffers && self.debug.recent_capacity == 0 {
            return Err(CoreError::ConfigError(
                "debug.recent_capacity must be non-zero when tracking is enabled".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, CoreError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn default_flags() -> Vec<Severity> {
    vec![Severity::Error, Severity::Warning]
}

fn default_recent_capacity() -> usize {
    10
}
