//! Install, uninstall and status of the logger in a Rime user directory

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::error::{PatchError, ResolveError};
use super::layout::{RimeLayout, CONFIG_SCRIPT, LOGGER_SCRIPT};
use super::lua_config::{set_preset_choice, Preset, ResolvedLogPath};
use super::schema::{InstallOutcome, RevertOutcome, SchemaPatcher};
use crate::fs::FileSystem;

/// What happened to the config script during install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigAction {
    /// Copied from the assets template
    Created,
    /// Existing user file kept, only its preset changed
    PresetUpdated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub preset: Preset,
    pub logger_script: PathBuf,
    pub config_script: PathBuf,
    pub config_action: ConfigAction,
    pub schema: InstallOutcome,
}

/// Per-file result of uninstall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalOutcome {
    Removed,
    NotFound,
    Kept,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UninstallReport {
    pub logger_script: RemovalOutcome,
    pub config_script: RemovalOutcome,
    pub schema: RevertOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaState {
    Configured,
    NotConfigured,
    Missing,
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStatus {
    pub path: PathBuf,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallStatus {
    pub user_dir: PathBuf,
    pub logger_script: FileStatus,
    pub config_script: FileStatus,
    pub schema_file: PathBuf,
    pub schema: SchemaState,
    pub log_file: ResolvedLogPath,
    pub log_file_exists: bool,
}

impl InstallStatus {
    /// Scripts present and schema patched
    pub fn is_installed(&self) -> bool {
        self.logger_script.present
            && self.config_script.present
            && self.schema == SchemaState::Configured
    }
}

/// Drives the install lifecycle against one [`RimeLayout`]
pub struct Installer<'a> {
    fs: &'a dyn FileSystem,
    layout: RimeLayout,
    assets_dir: PathBuf,
}

impl<'a> Installer<'a> {
    pub fn new(fs: &'a dyn FileSystem, layout: RimeLayout, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            layout,
            assets_dir: assets_dir.into(),
        }
    }

    pub fn layout(&self) -> &RimeLayout {
        &self.layout
    }

    fn patcher(&self) -> SchemaPatcher<'a> {
        SchemaPatcher::new(self.fs, &self.layout.schema_file)
    }

    fn asset(&self, name: &str) -> Result<PathBuf, PatchError> {
        let path = self.assets_dir.join(name);
        if self.fs.is_file(&path) {
            Ok(path)
        } else {
            Err(PatchError::AssetMissing(path))
        }
    }

    /// Copies the scripts, selects `preset` and registers the logger in the schema
    ///
    /// # Errors
    ///
    /// `UnsupportedPreset` for [`Preset::Custom`], which needs manual edits.
    /// `SchemaNotFound` and `AnchorNotFound` if the schema cannot be patched;
    /// the scripts are left in place so that a retry after fixing the schema
    /// completes the install.
    pub fn install(&self, preset: Preset) -> Result<InstallReport, PatchError> {
        if !preset.is_installable() {
            return Err(PatchError::UnsupportedPreset(preset.to_string()));
        }

        let logger_asset = self.asset(LOGGER_SCRIPT)?;
        let config_asset = self.asset(CONFIG_SCRIPT)?;

        self.fs.create_dir_all(&self.layout.lua_dir)?;

        let logger_script = self.layout.logger_script();
        self.fs.copy(&logger_asset, &logger_script)?;
        info!(path = %logger_script.display(), "Installed logger script");

        let config_script = self.layout.config_script();
        let (source, config_action) = if self.fs.is_file(&config_script) {
            (config_script.clone(), ConfigAction::PresetUpdated)
        } else {
            (config_asset, ConfigAction::Created)
        };
        let template = self.fs.read_to_string(&source)?;
        let content = with_preset(&template, preset, &source)?;
        self.fs.write_atomic(&config_script, &content)?;
        info!(path = %config_script.display(), %preset, "Installed config script");

        let schema = self.patcher().install()?;

        Ok(InstallReport {
            preset,
            logger_script,
            config_script,
            config_action,
            schema,
        })
    }

    /// Removes the scripts and the schema registration
    ///
    /// A missing schema is reported, not treated as an error.
    pub fn uninstall(&self, keep_config: bool) -> Result<UninstallReport, PatchError> {
        let logger_script = self.remove(&self.layout.logger_script())?;

        let config_script = if keep_config {
            info!(path = %self.layout.config_script().display(), "Keeping config script");
            RemovalOutcome::Kept
        } else {
            self.remove(&self.layout.config_script())?
        };

        let schema = self.patcher().revert()?;

        Ok(UninstallReport {
            logger_script,
            config_script,
            schema,
        })
    }

    fn remove(&self, path: &Path) -> Result<RemovalOutcome, PatchError> {
        if !self.fs.is_file(path) {
            warn!(path = %path.display(), "Not found, nothing to remove");
            return Ok(RemovalOutcome::NotFound);
        }
        self.fs.remove_file(path)?;
        info!(path = %path.display(), "Removed");
        Ok(RemovalOutcome::Removed)
    }

    pub fn status(&self) -> InstallStatus {
        let file_status = |path: PathBuf| FileStatus {
            present: self.fs.is_file(&path),
            path,
        };

        let schema = if !self.fs.exists(&self.layout.schema_file) {
            SchemaState::Missing
        } else {
            match self.patcher().is_installed() {
                Ok(true) => SchemaState::Configured,
                Ok(false) => SchemaState::NotConfigured,
                Err(e) => {
                    warn!(error = %e, "Could not read schema file");
                    SchemaState::Unreadable
                }
            }
        };

        let log_file = self.layout.log_file_path(self.fs);
        let log_file_exists = self.fs.is_file(&log_file.path);

        InstallStatus {
            user_dir: self.layout.user_dir.clone(),
            logger_script: file_status(self.layout.logger_script()),
            config_script: file_status(self.layout.config_script()),
            schema_file: self.layout.schema_file.clone(),
            schema,
            log_file,
            log_file_exists,
        }
    }
}

fn with_preset(content: &str, preset: Preset, source: &Path) -> Result<String, PatchError> {
    set_preset_choice(content, preset).map_err(|e| match e {
        ResolveError::NoPresetChoice => PatchError::PresetChoiceNotFound(source.to_path_buf()),
        other => PatchError::Io(other.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FsOp, MockFileSystem};
    use crate::rime::layout::DEFAULT_SCHEMA_FILE;
    use crate::rime::lua_config::{find_preset_choice, LogPathSource};
    use crate::rime::schema::SCHEMA_MARKER;

    const SCHEMA: &str = "engine:\n  processors:\n    - speller\n    - punctuator\n    - selector\n";
    const CONFIG_TEMPLATE: &str = "\
local preset_choice = \"normal\"

local presets = {
    normal = {
        log_file_path = \"\",
    },
    advanced = {
        log_file_path = \"/data/advanced.jsonl\",
    },
}
";

    fn setup() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("assets/input_habit_logger.lua", "-- logger");
        fs.add_file("assets/input_habit_logger_config.lua", CONFIG_TEMPLATE);
        fs.add_file("rime/wanxiang.schema.yaml", SCHEMA);
        fs
    }

    fn installer(fs: &MockFileSystem) -> Installer<'_> {
        Installer::new(
            fs,
            RimeLayout::new("/mock/rime", DEFAULT_SCHEMA_FILE),
            "/mock/assets",
        )
    }

    #[test]
    fn test_install_fresh() {
        let fs = setup();
        let report = installer(&fs).install(Preset::Developer).unwrap();

        assert_eq!(report.config_action, ConfigAction::Created);
        assert!(matches!(report.schema, InstallOutcome::Installed { line: 5, .. }));
        assert_eq!(
            fs.content("rime/lua/input_habit_logger.lua").as_deref(),
            Some("-- logger")
        );

        let config = fs.content("rime/lua/input_habit_logger_config.lua").unwrap();
        assert_eq!(find_preset_choice(&config), Some("developer"));
        assert_eq!(
            config,
            CONFIG_TEMPLATE.replace("\"normal\"", "\"developer\"")
        );

        let schema = fs.content("rime/wanxiang.schema.yaml").unwrap();
        assert!(schema.contains(&format!("    - punctuator\n    {}\n", SCHEMA_MARKER)));
    }

    #[test]
    fn test_install_keeps_user_config() {
        let fs = setup();
        let edited = CONFIG_TEMPLATE.replace("/data/advanced.jsonl", "/home/me/custom.jsonl");
        fs.add_file("rime/lua/input_habit_logger_config.lua", &edited);

        let report = installer(&fs).install(Preset::Advanced).unwrap();

        assert_eq!(report.config_action, ConfigAction::PresetUpdated);
        let config = fs.content("rime/lua/input_habit_logger_config.lua").unwrap();
        assert!(config.contains("/home/me/custom.jsonl"));
        assert_eq!(find_preset_choice(&config), Some("advanced"));
    }

    #[test]
    fn test_install_twice_does_not_duplicate_marker() {
        let fs = setup();
        let installer = installer(&fs);
        installer.install(Preset::Normal).unwrap();
        let report = installer.install(Preset::Normal).unwrap();

        assert_eq!(report.schema, InstallOutcome::AlreadyInstalled);
        let schema = fs.content("rime/wanxiang.schema.yaml").unwrap();
        assert_eq!(schema.matches(SCHEMA_MARKER).count(), 1);
    }

    #[test]
    fn test_install_custom_is_rejected_without_changes() {
        let fs = setup();
        let err = installer(&fs).install(Preset::Custom).unwrap_err();

        assert!(matches!(err, PatchError::UnsupportedPreset(_)));
        assert!(fs.journal().is_empty());
    }

    #[test]
    fn test_install_missing_asset() {
        let fs = MockFileSystem::new();
        fs.add_file("rime/wanxiang.schema.yaml", SCHEMA);

        let err = installer(&fs).install(Preset::Normal).unwrap_err();
        assert!(matches!(err, PatchError::AssetMissing(_)));
        assert!(fs.journal().is_empty());
    }

    #[test]
    fn test_install_missing_schema() {
        let fs = MockFileSystem::new();
        fs.add_file("assets/input_habit_logger.lua", "-- logger");
        fs.add_file("assets/input_habit_logger_config.lua", CONFIG_TEMPLATE);
        fs.add_dir("rime");

        let err = installer(&fs).install(Preset::Normal).unwrap_err();
        assert!(matches!(err, PatchError::SchemaNotFound(_)));
    }

    #[test]
    fn test_install_template_without_preset_choice() {
        let fs = setup();
        fs.add_file("assets/input_habit_logger_config.lua", "return {}\n");

        let err = installer(&fs).install(Preset::Normal).unwrap_err();
        assert!(matches!(err, PatchError::PresetChoiceNotFound(_)));
    }

    #[test]
    fn test_uninstall_removes_everything() {
        let fs = setup();
        let installer = installer(&fs);
        installer.install(Preset::Normal).unwrap();

        let report = installer.uninstall(false).unwrap();

        assert_eq!(report.logger_script, RemovalOutcome::Removed);
        assert_eq!(report.config_script, RemovalOutcome::Removed);
        assert!(matches!(report.schema, RevertOutcome::Reverted { removed: 1, .. }));
        assert_eq!(fs.content("rime/wanxiang.schema.yaml").as_deref(), Some(SCHEMA));
        assert!(fs.content("rime/lua/input_habit_logger.lua").is_none());
    }

    #[test]
    fn test_uninstall_keep_config() {
        let fs = setup();
        let installer = installer(&fs);
        installer.install(Preset::Normal).unwrap();

        let report = installer.uninstall(true).unwrap();

        assert_eq!(report.config_script, RemovalOutcome::Kept);
        assert!(fs.content("rime/lua/input_habit_logger_config.lua").is_some());
    }

    #[test]
    fn test_uninstall_when_nothing_installed() {
        let fs = MockFileSystem::new();
        fs.add_dir("rime");

        let report = installer(&fs).uninstall(false).unwrap();

        assert_eq!(report.logger_script, RemovalOutcome::NotFound);
        assert_eq!(report.config_script, RemovalOutcome::NotFound);
        assert_eq!(report.schema, RevertOutcome::SchemaMissing);
        assert!(fs.journal().is_empty());
    }

    #[test]
    fn test_uninstall_writes_backup_before_revert() {
        let fs = setup();
        let installer = installer(&fs);
        installer.install(Preset::Normal).unwrap();
        let installed = fs.content("rime/wanxiang.schema.yaml").unwrap();

        installer.uninstall(true).unwrap();

        let journal = fs.journal();
        let tail = &journal[journal.len() - 2..];
        assert_eq!(
            tail,
            [
                FsOp::Write(PathBuf::from(
                    "/mock/rime/wanxiang.schema.yaml.uninstall.bak"
                )),
                FsOp::WriteAtomic(PathBuf::from("/mock/rime/wanxiang.schema.yaml")),
            ]
        );
        assert_eq!(
            fs.content("rime/wanxiang.schema.yaml.uninstall.bak").as_deref(),
            Some(installed.as_str())
        );
    }

    #[test]
    fn test_uninstall_keeps_pre_install_backup() {
        let fs = setup();
        let original = fs.content("rime/wanxiang.schema.yaml").unwrap();
        let installer = installer(&fs);

        installer.install(Preset::Normal).unwrap();
        assert_eq!(
            fs.content("rime/wanxiang.schema.yaml.bak").as_deref(),
            Some(original.as_str())
        );

        installer.uninstall(false).unwrap();

        assert_eq!(
            fs.content("rime/wanxiang.schema.yaml.bak").as_deref(),
            Some(original.as_str())
        );
        assert_eq!(
            fs.content("rime/wanxiang.schema.yaml").as_deref(),
            Some(original.as_str())
        );
    }

    #[test]
    fn test_status_before_and_after_install() {
        let fs = setup();
        let installer = installer(&fs);

        let before = installer.status();
        assert!(!before.is_installed());
        assert!(!before.logger_script.present);
        assert_eq!(before.schema, SchemaState::NotConfigured);
        assert_eq!(before.log_file.source, LogPathSource::Default);

        installer.install(Preset::Advanced).unwrap();
        fs.add_file("/data/advanced.jsonl", "");

        let after = installer.status();
        assert!(after.is_installed());
        assert_eq!(after.schema, SchemaState::Configured);
        assert_eq!(after.log_file.path, PathBuf::from("/data/advanced.jsonl"));
        assert_eq!(after.log_file.source, LogPathSource::Preset("advanced".to_string()));
        assert!(after.log_file_exists);
    }

    #[test]
    fn test_status_missing_schema() {
        let fs = MockFileSystem::new();
        fs.add_dir("rime");

        let status = installer(&fs).status();
        assert_eq!(status.schema, SchemaState::Missing);
        assert!(!status.log_file_exists);
    }

    #[test]
    fn test_status_unreadable_schema() {
        let fs = MockFileSystem::new();
        fs.add_dir("rime/wanxiang.schema.yaml");

        let status = installer(&fs).status();
        assert_eq!(status.schema, SchemaState::Unreadable);
    }
}
