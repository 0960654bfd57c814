use std::path::PathBuf;
use thiserror::Error;

/// Failures of install, uninstall and text patching
#[derive(Debug, Error)]
pub enum PatchError {
    #[error(
        "Schema file not found: {}. Make sure the schema is installed and Rime has been deployed at least once",
        .0.display()
    )]
    SchemaNotFound(PathBuf),

    #[error(
        "Could not find a '- ...{keyword}' list entry in the schema. Add this line manually under engine/processors: {marker}"
    )]
    AnchorNotFound { keyword: String, marker: String },

    #[error("No `preset_choice = \"...\"` assignment found in {}", .0.display())]
    PresetChoiceNotFound(PathBuf),

    #[error("Preset '{0}' cannot be installed automatically")]
    UnsupportedPreset(String),

    #[error("Asset not found: {}", .0.display())]
    AssetMissing(PathBuf),

    #[error("Failed to write backup {}: {reason}; original file left untouched", .path.display())]
    BackupFailed { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Why the config file did not yield a custom log path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no `preset_choice = \"...\"` assignment")]
    NoPresetChoice,

    #[error("no `{preset} = {{ ... }}` block for the active preset")]
    PresetBlockNotFound { preset: String },

    #[error("`log_file_path` is not set in preset '{preset}'")]
    LogPathNotSet { preset: String },
}
