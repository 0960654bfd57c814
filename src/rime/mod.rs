//! Rime user-directory integration
//!
//! - [`layout`]: where the user directory and the logger's files live
//! - [`lua_config`]: preset selection and log path lookup in the Lua config
//! - [`schema`]: idempotent schema patching with backup
//! - [`installer`]: install, uninstall and status flows

pub mod error;
pub mod installer;
pub mod layout;
pub mod lua_config;
pub mod schema;

pub use error::{PatchError, ResolveError};
pub use installer::{
    ConfigAction, FileStatus, InstallReport, InstallStatus, Installer, RemovalOutcome,
    SchemaState, UninstallReport,
};
pub use layout::{
    RimeLayout, CONFIG_SCRIPT, DEFAULT_LOG_FILE, DEFAULT_SCHEMA_FILE, LOGGER_SCRIPT,
};
pub use lua_config::{
    extract_log_path, find_block, find_preset_choice, resolve_log_path, set_preset_choice,
    LogPathSource, Preset, ResolvedLogPath,
};
pub use schema::{
    InstallOutcome, RevertOutcome, SchemaDocument, SchemaPatcher, ANCHOR_KEYWORD, SCHEMA_MARKER,
};
