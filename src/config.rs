//! Configuration management for rime-logger
//!
//! Settings are loaded from environment variables with sensible defaults.
//! Command-line options override individual fields after loading.
//!
//! # Environment Variables
//!
//! - `RIME_LOGGER_USER_DIR`: Rime user directory - default: auto-detected per OS
//! - `RIME_LOGGER_SCHEMA`: Schema file to patch - default: "wanxiang.schema.yaml"
//! - `RIME_LOGGER_ASSETS_DIR`: Directory holding the Lua scripts to install -
//!   default: `assets/` next to the executable
//! - `RIME_LOGGER_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use rime_logger::RimeLoggerConfig;
//! use std::env;
//!
//! env::set_var("RIME_LOGGER_USER_DIR", "/home/me/.local/share/fcitx5/rime");
//!
//! let config = RimeLoggerConfig::default();
//! config.validate().expect("Invalid configuration");
//! ```

use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::rime::layout::DEFAULT_SCHEMA_FILE;

const DEFAULT_LOG_LEVEL: &str = "info";
const ASSETS_DIR_NAME: &str = "assets";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// No home or application-data directory to search from
    #[error("Cannot determine the home directory. Set RIME_LOGGER_USER_DIR or pass --rime-dir")]
    HomeDirUnavailable,

    /// The Rime user directory does not exist
    #[error(
        "Rime user directory not found: {}. Make sure Rime is installed and has been deployed, or set RIME_LOGGER_USER_DIR",
        .0.display()
    )]
    UserDirNotFound(PathBuf),

    /// The Rime user directory path is not a directory
    #[error("Rime user directory is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Main configuration structure for rime-logger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RimeLoggerConfig {
    /// Explicit Rime user directory; auto-detected when `None`
    pub user_dir: Option<PathBuf>,

    /// Schema file name inside the user directory
    pub schema_file: String,

    /// Explicit assets directory; `assets/` next to the executable when `None`
    pub assets_dir: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for RimeLoggerConfig {
    /// Loads RIME_LOGGER_* environment variables, falling back to defaults
    fn default() -> Self {
        let user_dir = non_empty_var("RIME_LOGGER_USER_DIR").map(PathBuf::from);

        let schema_file = env::var("RIME_LOGGER_SCHEMA")
            .unwrap_or_else(|_| DEFAULT_SCHEMA_FILE.to_string());

        let assets_dir = non_empty_var("RIME_LOGGER_ASSETS_DIR").map(PathBuf::from);

        let log_level = env::var("RIME_LOGGER_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            user_dir,
            schema_file,
            assets_dir,
            log_level,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl RimeLoggerConfig {
    /// Validates the configuration
    ///
    /// Checks that:
    /// - The schema file name is a bare, non-empty file name
    /// - Log level is valid
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any validation fails
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_file.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Schema file name cannot be empty".to_string(),
            ));
        }
        if self.schema_file.contains(['/', '\\']) {
            return Err(ConfigError::ValidationFailed(format!(
                "Schema file must be a file name inside the Rime user directory, got: {}",
                self.schema_file
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Directory the Lua scripts are copied from
    ///
    /// Falls back to `assets/` beside the running executable, then to
    /// `assets/` in the working directory.
    pub fn assets_dir(&self) -> PathBuf {
        if let Some(dir) = &self.assets_dir {
            return dir.clone();
        }

        env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.join(ASSETS_DIR_NAME)))
            .unwrap_or_else(|| PathBuf::from(ASSETS_DIR_NAME))
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> std::collections::HashMap<String, String> {
        let mut map = std::collections::HashMap::new();

        map.insert(
            "user_dir".to_string(),
            self.user_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "auto".to_string()),
        );
        map.insert("schema_file".to_string(), self.schema_file.clone());
        map.insert(
            "assets_dir".to_string(),
            self.assets_dir().display().to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for RimeLoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rime Logger Configuration:")?;
        match &self.user_dir {
            Some(dir) => writeln!(f, "  User Dir: {}", dir.display())?,
            None => writeln!(f, "  User Dir: auto")?,
        }
        writeln!(f, "  Schema File: {}", self.schema_file)?;
        writeln!(f, "  Assets Dir: {}", self.assets_dir().display())?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
