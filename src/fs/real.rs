use super::FileSystem;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::warn;

pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).context(format!("Failed to read file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents).context(format!("Failed to write file {:?}", path))
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // The temp file must live on the same file system for the rename to be atomic
        let mut tmp = NamedTempFile::new_in(dir)
            .context(format!("Failed to create temporary file in {:?}", dir))?;
        tmp.write_all(contents.as_bytes())
            .context(format!("Failed to write temporary file for {:?}", path))?;
        tmp.as_file()
            .sync_all()
            .context(format!("Failed to sync temporary file for {:?}", path))?;

        if let Ok(meta) = fs::metadata(path) {
            // Keep the original permissions; the temp file is created 0600
            if let Err(e) = fs::set_permissions(tmp.path(), meta.permissions()) {
                warn!(path = %path.display(), error = %e, "Failed to keep file permissions");
            }
        }

        tmp.persist(path)
            .map_err(|e| e.error)
            .context(format!("Failed to replace file {:?}", path))?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).context(format!("Failed to remove file {:?}", path))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).context(format!("Failed to create directory {:?}", path))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        fs::copy(from, to).context(format!("Failed to copy {:?} to {:?}", from, to))?;
        Ok(())
    }
}
