//! File-system port used by the generators
//!
//! Generators never touch `std::fs` directly. [`LocalFilesystem`] is the real
//! implementation; [`MemoryFilesystem`] keeps everything in a map for tests
//! and dry runs.

use crate::error::{DefinitionError, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Minimal file operations needed to write generated code
pub trait Filesystem {
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write `contents`, creating parent directories as needed
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn ensure_dir(&self, path: &Path) -> Result<()>;
}

/// The real file system
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(DefinitionError::FileNotFound(path.to_path_buf()));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.ensure_dir(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }
}

/// In-memory file system
///
/// Can be seeded from the real disk so a dry run sees existing files.
#[derive(Debug, Default)]
pub struct MemoryFilesystem {
    files: RefCell<BTreeMap<PathBuf, String>>,
    fallback: bool,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads fall through to the real disk for files not written in memory
    pub fn overlay() -> Self {
        Self {
            files: RefCell::default(),
            fallback: true,
        }
    }

    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.borrow_mut().insert(path.into(), contents.into());
        self
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.borrow().get(path.as_ref()).cloned()
    }

    /// Every path written or seeded, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.borrow().keys().cloned().collect()
    }
}

impl Filesystem for MemoryFilesystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        if let Some(contents) = self.files.borrow().get(path) {
            return Ok(contents.clone());
        }
        if self.fallback {
            return LocalFilesystem.read_to_string(path);
        }
        Err(DefinitionError::FileNotFound(path.to_path_buf()))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path) || (self.fallback && path.exists())
    }

    fn ensure_dir(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.php");
        LocalFilesystem.write(&path, "<?php\n").unwrap();
        assert!(LocalFilesystem.exists(&path));
        assert_eq!(LocalFilesystem.read_to_string(&path).unwrap(), "<?php\n");
        assert!(
            LocalFilesystem
                .read_to_string(&dir.path().join("missing"))
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn test_memory_filesystem() {
        let fs = MemoryFilesystem::new().with_file("x.txt", "seed");
        assert!(fs.exists(Path::new("x.txt")));
        fs.write(Path::new("y.txt"), "new").unwrap();
        assert_eq!(fs.get("y.txt").as_deref(), Some("new"));
        assert_eq!(fs.paths(), vec![PathBuf::from("x.txt"), PathBuf::from("y.txt")]);
        assert!(fs.read_to_string(Path::new("z.txt")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_overlay_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("on_disk.txt");
        std::fs::write(&path, "disk").unwrap();

        let fs = MemoryFilesystem::overlay();
        assert!(fs.exists(&path));
        assert_eq!(fs.read_to_string(&path).unwrap(), "disk");
        fs.write(&path, "memory").unwrap();
        assert_eq!(fs.read_to_string(&path).unwrap(), "memory");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "disk");
    }
}
