//! Logging configuration
//!
//! Per-component log levels and output destinations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Logging configuration, usually embedded as the `[logging]` table of the
/// engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    pub global_level: String,

    /// Enable console output
    pub console_output: bool,

    /// Directory for JSON log files (None = no file logging)
    pub log_directory: Option<PathBuf>,

    /// File name prefix of the daily rolled log file
    pub file_prefix: String,

    /// Include file location in console logs
    pub include_file_location: bool,

    /// Level for feature extraction, matching and localization
    pub algorithm_level: String,

    /// Level for the engine facade and merging
    pub pipeline_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_level: "info".to_string(),
            console_output: true,
            log_directory: None,
            file_prefix: "locate.log".to_string(),
            include_file_location: false,
            algorithm_level: "info".to_string(),
            pipeline_level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Console-only configuration at the given level, as selected by `-v`
    /// flags on the command line.
    pub fn with_level(level: &str) -> Self {
        Self::default().overriding_level(level)
    }

    /// Same outputs, every component at `level`.
    pub fn overriding_level(mut self, level: &str) -> Self {
        self.global_level = level.to_string();
        self.algorithm_level = level.to_string();
        self.pipeline_level = level.to_string();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, level) in [
            ("global_level", &self.global_level),
            ("algorithm_level", &self.algorithm_level),
            ("pipeline_level", &self.pipeline_level),
        ] {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(format!(
                    "Invalid {}: {}. Must be one of: {:?}",
                    name, level, VALID_LEVELS
                ));
            }
        }

        if let Some(ref log_dir) = self.log_directory {
            if let Some(parent) = log_dir.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(format!("Log directory parent does not exist: {:?}", parent));
                }
            }
        }

        Ok(())
    }

    /// `EnvFilter` directives for this crate's components.
    pub fn filter_directives(&self) -> String {
        let krate = env!("CARGO_PKG_NAME").replace('-', "_");
        format!(
            "{krate}={},{krate}::algorithms={},{krate}::utils={},{krate}::pipeline={}",
            self.global_level, self.algorithm_level, self.algorithm_level, self.pipeline_level
        )
    }
}
