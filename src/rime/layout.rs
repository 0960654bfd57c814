//! Location of the Rime user directory and the files the logger touches

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::lua_config::{resolve_log_path, ResolvedLogPath};
use crate::config::{ConfigError, RimeLoggerConfig};
use crate::fs::FileSystem;

pub const LOGGER_SCRIPT: &str = "input_habit_logger.lua";
pub const CONFIG_SCRIPT: &str = "input_habit_logger_config.lua";
pub const DEFAULT_SCHEMA_FILE: &str = "wanxiang.schema.yaml";
pub const DEFAULT_LOG_FILE: &str = "input_habit_log_structured.jsonl";
pub const LUA_DIR: &str = "lua";

/// Paths inside one Rime user directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RimeLayout {
    pub user_dir: PathBuf,
    pub lua_dir: PathBuf,
    pub schema_file: PathBuf,
}

impl RimeLayout {
    pub fn new(user_dir: impl Into<PathBuf>, schema_file: &str) -> Self {
        let user_dir = user_dir.into();
        Self {
            lua_dir: user_dir.join(LUA_DIR),
            schema_file: user_dir.join(schema_file),
            user_dir,
        }
    }

    /// Locates the user directory from `config` or the platform defaults
    ///
    /// # Errors
    ///
    /// `UserDirNotFound` if the chosen directory does not exist,
    /// `NotADirectory` if it is a file.
    pub fn discover(fs: &dyn FileSystem, config: &RimeLoggerConfig) -> Result<Self, ConfigError> {
        let user_dir = match &config.user_dir {
            Some(dir) => {
                debug!(dir = %dir.display(), "Using configured Rime user directory");
                dir.clone()
            }
            None => select_user_dir(fs, &default_user_dirs()?)
                .ok_or(ConfigError::HomeDirUnavailable)?,
        };

        if !fs.exists(&user_dir) {
            return Err(ConfigError::UserDirNotFound(user_dir));
        }
        if !fs.is_dir(&user_dir) {
            return Err(ConfigError::NotADirectory(user_dir));
        }

        info!(dir = %user_dir.display(), "Rime user directory");
        Ok(Self::new(user_dir, &config.schema_file))
    }

    pub fn logger_script(&self) -> PathBuf {
        self.lua_dir.join(LOGGER_SCRIPT)
    }

    pub fn config_script(&self) -> PathBuf {
        self.lua_dir.join(CONFIG_SCRIPT)
    }

    pub fn default_log_file(&self) -> PathBuf {
        self.user_dir.join(DEFAULT_LOG_FILE)
    }

    /// Effective log file: the active preset's `log_file_path`, or the default
    pub fn log_file_path(&self, fs: &dyn FileSystem) -> ResolvedLogPath {
        resolve_log_path(fs, &self.config_script(), &self.default_log_file())
    }
}

/// Candidate user directories for the current platform, most preferred first
pub fn default_user_dirs() -> Result<Vec<PathBuf>, ConfigError> {
    if cfg!(target_os = "windows") {
        let appdata = dirs::config_dir().ok_or(ConfigError::HomeDirUnavailable)?;
        return Ok(vec![appdata.join("Rime")]);
    }

    let home = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;
    if cfg!(target_os = "macos") {
        return Ok(vec![home.join("Library").join("Rime")]);
    }

    Ok(linux_user_dirs(&home))
}

/// fcitx, fcitx5 and ibus each keep their own Rime tree
pub fn linux_user_dirs(home: &Path) -> Vec<PathBuf> {
    let config = home.join(".config");
    vec![
        config.join("rime"),
        config.join("fcitx").join("rime"),
        config.join("fcitx5").join("rime"),
        config.join("ibus").join("rime"),
    ]
}

/// First existing candidate, else the first candidate
pub fn select_user_dir(fs: &dyn FileSystem, candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|dir| fs.is_dir(dir))
        .or_else(|| candidates.first())
        .cloned()
}
