//! FileSystem trait definition

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Type of file system entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
}

/// Abstraction over file system operations for testability
pub trait FileSystem: Send + Sync {
    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Read file contents as string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write file contents in place, truncating any existing file
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Replace file contents so readers observe either the old or the new
    /// content, never a partial write
    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()>;

    /// Remove a single file
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Create a directory and all missing parents
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Copy a text file
    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let contents = self.read_to_string(from)?;
        self.write(to, &contents)
    }
}

/// Sibling backup path with `suffix` appended to the full file name
pub fn backup_path_with(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
