//! Idempotent registration of the logger in a Rime schema file
//!
//! The schema is edited as plain lines rather than parsed as YAML so that
//! comments, ordering and formatting survive untouched. The logger entry is
//! inserted right after the first `- ...punctuator...` list item, which sits in
//! `engine/processors` of every stock schema.

use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

use super::error::PatchError;
use crate::fs::{backup_path_with, FileSystem};

/// The processor registration line, without indentation
pub const SCHEMA_MARKER: &str =
    "- lua_processor@*input_habit_logger #输入习惯记录器 - 记录用户输入习惯";

/// Substring identifying the anchor list item
pub const ANCHOR_KEYWORD: &str = "punctuator";

/// Suffix of the backup written before install
pub const INSTALL_BACKUP_SUFFIX: &str = ".bak";

/// Suffix of the backup written before revert
pub const REVERT_BACKUP_SUFFIX: &str = ".uninstall.bak";

/// A schema file as an ordered sequence of lines
///
/// Lines are split on `\n` only, so `render` reproduces the original bytes,
/// including `\r` endings and the presence or absence of a final newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDocument {
    lines: Vec<String>,
}

impl SchemaDocument {
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.split('\n').map(str::to_string).collect(),
        }
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn marker_count(&self, marker: &str) -> usize {
        self.lines.iter().filter(|l| l.contains(marker)).count()
    }

    pub fn contains_marker(&self, marker: &str) -> bool {
        self.lines.iter().any(|l| l.contains(marker))
    }

    /// Index of the first list item mentioning `keyword`
    pub fn find_anchor(&self, keyword: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.trim().starts_with('-') && l.contains(keyword))
    }

    /// Inserts `marker` after the anchor with the anchor's indentation
    ///
    /// Returns the index of the inserted line, or `None` when the marker is
    /// already present.
    pub fn insert_marker(&mut self, marker: &str) -> Result<Option<usize>, PatchError> {
        if self.contains_marker(marker) {
            return Ok(None);
        }

        let anchor = self
            .find_anchor(ANCHOR_KEYWORD)
            .ok_or_else(|| PatchError::AnchorNotFound {
                keyword: ANCHOR_KEYWORD.to_string(),
                marker: marker.to_string(),
            })?;

        let anchor_line = &self.lines[anchor];
        let mut line = format!("{}{}", leading_indent(anchor_line), marker);
        if anchor_line.ends_with('\r') {
            line.push('\r');
        }

        self.lines.insert(anchor + 1, line);
        Ok(Some(anchor + 1))
    }

    /// Removes every line containing `marker`; returns how many were removed
    pub fn remove_marker(&mut self, marker: &str) -> usize {
        let before = self.lines.len();
        self.lines.retain(|l| !l.contains(marker));
        before - self.lines.len()
    }
}

/// Leading run of spaces and tabs
fn leading_indent(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum InstallOutcome {
    /// Marker inserted at 1-based `line`
    Installed { line: usize, backup: PathBuf },
    AlreadyInstalled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum RevertOutcome {
    Reverted { removed: usize, backup: PathBuf },
    NotInstalled,
    SchemaMissing,
}

/// Applies install and revert to a schema file on disk
///
/// Every rewrite is preceded by a byte-for-byte backup: `<schema>.bak` before
/// install and `<schema>.uninstall.bak` before revert, so the pre-install copy
/// survives an uninstall. If the backup cannot be written the schema is not
/// touched. The rewrite itself is atomic.
pub struct SchemaPatcher<'a> {
    fs: &'a dyn FileSystem,
    path: PathBuf,
    marker: String,
}

impl<'a> SchemaPatcher<'a> {
    pub fn new(fs: &'a dyn FileSystem, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
            marker: SCHEMA_MARKER.to_string(),
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn is_installed(&self) -> Result<bool, PatchError> {
        let content = self.read()?;
        Ok(SchemaDocument::parse(&content).contains_marker(&self.marker))
    }

    pub fn install(&self) -> Result<InstallOutcome, PatchError> {
        let original = self.read()?;
        let mut doc = SchemaDocument::parse(&original);

        let Some(index) = doc.insert_marker(&self.marker)? else {
            info!(schema = %self.path.display(), "Schema already configured, no changes needed");
            return Ok(InstallOutcome::AlreadyInstalled);
        };

        let backup = self.backup(&original, INSTALL_BACKUP_SUFFIX)?;
        self.fs.write_atomic(&self.path, &doc.render())?;

        info!(schema = %self.path.display(), line = index + 1, "Logger registered in schema");
        Ok(InstallOutcome::Installed {
            line: index + 1,
            backup,
        })
    }

    pub fn revert(&self) -> Result<RevertOutcome, PatchError> {
        if !self.fs.exists(&self.path) {
            debug!(schema = %self.path.display(), "Schema file not found, skipping revert");
            return Ok(RevertOutcome::SchemaMissing);
        }

        let original = self.read()?;
        let mut doc = SchemaDocument::parse(&original);
        let removed = doc.remove_marker(&self.marker);
        if removed == 0 {
            info!(schema = %self.path.display(), "Logger entry not found in schema, no changes needed");
            return Ok(RevertOutcome::NotInstalled);
        }

        let backup = self.backup(&original, REVERT_BACKUP_SUFFIX)?;
        self.fs.write_atomic(&self.path, &doc.render())?;

        info!(schema = %self.path.display(), removed, "Logger entry removed from schema");
        Ok(RevertOutcome::Reverted { removed, backup })
    }

    fn read(&self) -> Result<String, PatchError> {
        if !self.fs.is_file(&self.path) {
            return Err(PatchError::SchemaNotFound(self.path.clone()));
        }
        Ok(self.fs.read_to_string(&self.path)?)
    }

    fn backup(&self, original: &str, suffix: &str) -> Result<PathBuf, PatchError> {
        let path = backup_path_with(&self.path, suffix);
        self.fs
            .write(&path, original)
            .map_err(|e| PatchError::BackupFailed {
                path: path.clone(),
                reason: format!("{:#}", e),
            })?;
        info!(backup = %path.display(), "Schema backed up");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FsOp, MockFileSystem};

    const SCHEMA: &str = "\
schema:
  schema_id: wanxiang
engine:
  processors:
    - ascii_composer
    - recognizer
    - key_binder
    - speller
    - punctuator
    - selector
    - navigator
    - express_editor
";

    fn schema_path() -> PathBuf {
        PathBuf::from("/mock/wanxiang.schema.yaml")
    }

    #[test]
    fn test_parse_render_roundtrip_is_exact() {
        for content in [SCHEMA, "", "no newline", "a\r\nb\r\n", "\n\n"] {
            assert_eq!(SchemaDocument::parse(content).render(), content);
        }
    }

    #[test]
    fn test_insert_after_first_punctuator_with_indentation() {
        let mut doc = SchemaDocument::parse(SCHEMA);
        let index = doc.insert_marker(SCHEMA_MARKER).unwrap();

        assert_eq!(index, Some(9));
        assert_eq!(doc.lines()[8], "    - punctuator");
        assert_eq!(doc.lines()[9], format!("    {}", SCHEMA_MARKER));
        assert_eq!(doc.lines()[10], "    - selector");
        assert_eq!(doc.lines().len(), SchemaDocument::parse(SCHEMA).lines().len() + 1);
    }

    #[test]
    fn test_insert_twice_is_idempotent() {
        let mut once = SchemaDocument::parse(SCHEMA);
        once.insert_marker(SCHEMA_MARKER).unwrap();

        let mut twice = once.clone();
        assert_eq!(twice.insert_marker(SCHEMA_MARKER).unwrap(), None);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_anchor_must_be_list_item() {
        let content = "\
punctuator:
  import_preset: symbols
engine:
  processors:
\t- punctuator # punctuation
";
        let mut doc = SchemaDocument::parse(content);
        let index = doc.insert_marker(SCHEMA_MARKER).unwrap().unwrap();

        assert_eq!(index, 5);
        assert_eq!(doc.lines()[5], format!("\t{}", SCHEMA_MARKER));
    }

    #[test]
    fn test_crlf_line_endings_are_kept() {
        let content = "engine:\r\n  processors:\r\n    - punctuator\r\n    - selector\r\n";
        let mut doc = SchemaDocument::parse(content);
        doc.insert_marker(SCHEMA_MARKER).unwrap();

        assert_eq!(
            doc.render(),
            format!(
                "engine:\r\n  processors:\r\n    - punctuator\r\n    {}\r\n    - selector\r\n",
                SCHEMA_MARKER
            )
        );
    }

    #[test]
    fn test_missing_anchor() {
        let mut doc = SchemaDocument::parse("engine:\n  processors:\n    - speller\n");
        let err = doc.insert_marker(SCHEMA_MARKER).unwrap_err();

        assert!(matches!(err, PatchError::AnchorNotFound { .. }));
        assert!(err.to_string().contains("punctuator"));
        assert!(err.to_string().contains(SCHEMA_MARKER));
    }

    #[test]
    fn test_remove_all_copies() {
        let content = format!(
            "a\n    {m}\nb\n    {m}\nc\n",
            m = SCHEMA_MARKER
        );
        let mut doc = SchemaDocument::parse(&content);
        assert_eq!(doc.marker_count(SCHEMA_MARKER), 2);

        assert_eq!(doc.remove_marker(SCHEMA_MARKER), 2);
        assert_eq!(doc.marker_count(SCHEMA_MARKER), 0);
        assert_eq!(doc.render(), "a\nb\nc\n");
    }

    #[test]
    fn test_remove_when_absent_is_noop() {
        let mut doc = SchemaDocument::parse(SCHEMA);
        assert_eq!(doc.remove_marker(SCHEMA_MARKER), 0);
        assert_eq!(doc.render(), SCHEMA);
    }

    #[test]
    fn test_install_then_revert_restores_original() {
        let mut doc = SchemaDocument::parse(SCHEMA);
        doc.insert_marker(SCHEMA_MARKER).unwrap();
        doc.remove_marker(SCHEMA_MARKER);
        assert_eq!(doc.render(), SCHEMA);
    }

    #[test]
    fn test_leading_indent() {
        assert_eq!(leading_indent("  \t - x"), "  \t ");
        assert_eq!(leading_indent("- x"), "");
        assert_eq!(leading_indent("   "), "   ");
    }

    #[test]
    fn test_patcher_install_backs_up_before_writing() {
        let fs = MockFileSystem::new();
        fs.add_file("wanxiang.schema.yaml", SCHEMA);

        let patcher = SchemaPatcher::new(&fs, schema_path());
        let outcome = patcher.install().unwrap();

        let backup = PathBuf::from("/mock/wanxiang.schema.yaml.bak");
        assert_eq!(
            outcome,
            InstallOutcome::Installed {
                line: 10,
                backup: backup.clone()
            }
        );
        assert_eq!(
            fs.journal(),
            vec![FsOp::Write(backup.clone()), FsOp::WriteAtomic(schema_path())]
        );
        assert_eq!(fs.content(&backup).as_deref(), Some(SCHEMA));
        assert!(patcher.is_installed().unwrap());
    }

    #[test]
    fn test_patcher_install_twice_writes_once() {
        let fs = MockFileSystem::new();
        fs.add_file("wanxiang.schema.yaml", SCHEMA);
        let patcher = SchemaPatcher::new(&fs, schema_path());

        patcher.install().unwrap();
        let after_first = fs.content(schema_path()).unwrap();
        assert_eq!(patcher.install().unwrap(), InstallOutcome::AlreadyInstalled);

        assert_eq!(fs.content(schema_path()).unwrap(), after_first);
        assert_eq!(fs.journal().len(), 2);
    }

    #[test]
    fn test_patcher_backup_failure_leaves_schema_untouched() {
        let fs = MockFileSystem::new();
        fs.add_file("wanxiang.schema.yaml", SCHEMA);
        fs.deny_writes("wanxiang.schema.yaml.bak");

        let err = SchemaPatcher::new(&fs, schema_path()).install().unwrap_err();

        assert!(matches!(err, PatchError::BackupFailed { .. }));
        assert_eq!(fs.content(schema_path()).as_deref(), Some(SCHEMA));
        assert!(fs.journal().is_empty());
    }

    #[test]
    fn test_patcher_missing_anchor_writes_nothing() {
        let fs = MockFileSystem::new();
        fs.add_file("wanxiang.schema.yaml", "engine:\n  processors:\n");

        let err = SchemaPatcher::new(&fs, schema_path()).install().unwrap_err();
        assert!(matches!(err, PatchError::AnchorNotFound { .. }));
        assert!(fs.journal().is_empty());
    }

    #[test]
    fn test_patcher_install_missing_schema() {
        let fs = MockFileSystem::new();
        let err = SchemaPatcher::new(&fs, schema_path()).install().unwrap_err();
        assert!(matches!(err, PatchError::SchemaNotFound(_)));
    }

    #[test]
    fn test_patcher_revert() {
        let fs = MockFileSystem::new();
        fs.add_file("wanxiang.schema.yaml", SCHEMA);
        let patcher = SchemaPatcher::new(&fs, schema_path());
        patcher.install().unwrap();
        let installed = fs.content(schema_path()).unwrap();

        let outcome = patcher.revert().unwrap();

        assert_eq!(
            outcome,
            RevertOutcome::Reverted {
                removed: 1,
                backup: PathBuf::from("/mock/wanxiang.schema.yaml.uninstall.bak")
            }
        );
        assert_eq!(fs.content(schema_path()).as_deref(), Some(SCHEMA));
        assert_eq!(
            fs.content("wanxiang.schema.yaml.uninstall.bak").as_deref(),
            Some(installed.as_str())
        );
    }

    #[test]
    fn test_revert_keeps_pre_install_backup() {
        let fs = MockFileSystem::new();
        fs.add_file("wanxiang.schema.yaml", SCHEMA);
        let patcher = SchemaPatcher::new(&fs, schema_path());

        patcher.install().unwrap();
        patcher.revert().unwrap();

        assert_eq!(fs.content("wanxiang.schema.yaml.bak").as_deref(), Some(SCHEMA));
    }

    #[test]
    fn test_revert_backup_failure_leaves_schema_untouched() {
        let fs = MockFileSystem::new();
        fs.add_file("wanxiang.schema.yaml", SCHEMA);
        let patcher = SchemaPatcher::new(&fs, schema_path());
        patcher.install().unwrap();
        let installed = fs.content(schema_path()).unwrap();
        fs.deny_writes("wanxiang.schema.yaml.uninstall.bak");

        let err = patcher.revert().unwrap_err();

        assert!(matches!(err, PatchError::BackupFailed { .. }));
        assert_eq!(fs.content(schema_path()), Some(installed));
        assert_eq!(fs.content("wanxiang.schema.yaml.bak").as_deref(), Some(SCHEMA));
    }

    #[test]
    fn test_patcher_revert_noop_and_missing() {
        let fs = MockFileSystem::new();
        let patcher = SchemaPatcher::new(&fs, schema_path());
        assert_eq!(patcher.revert().unwrap(), RevertOutcome::SchemaMissing);

        fs.add_file("wanxiang.schema.yaml", SCHEMA);
        assert_eq!(patcher.revert().unwrap(), RevertOutcome::NotInstalled);
        assert!(fs.journal().is_empty());
    }

    #[test]
    fn test_patcher_custom_marker() {
        let fs = MockFileSystem::new();
        fs.add_file("wanxiang.schema.yaml", SCHEMA);

        let patcher = SchemaPatcher::new(&fs, schema_path()).with_marker("- lua_processor@*other");
        patcher.install().unwrap();

        let content = fs.content(schema_path()).unwrap();
        assert!(content.contains("    - lua_processor@*other\n"));
        assert!(!content.contains(SCHEMA_MARKER));
    }
}
