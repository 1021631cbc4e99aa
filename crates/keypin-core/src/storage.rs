//! Persistence contract for the serialized PIN list
//!
//! The core only needs whole-file reads and writes. A missing file is not an
//! error: it means no PINs are configured.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Whole-file load/save backend for PIN data
pub trait PinPersistence {
    /// Read the stored text, `None` when nothing has been stored yet
    fn read(&self) -> Result<Option<String>>;

    /// Replace the stored text
    fn write(&mut self, contents: &str) -> Result<()>;
}

/// PIN data kept in a single file on disk
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PinPersistence for FileStorage {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            debug!("No PIN file at {:?}", self.path);
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.path)?))
    }

    fn write(&mut self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, &self.path)?;

        debug!("Saved PIN file to {:?}", self.path);
        Ok(())
    }
}

/// In-memory backend
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    contents: Option<String>,
    writes: usize,
}

impl MemoryStorage {
    /// Backend with nothing stored
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that already holds `contents`
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
            writes: 0,
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }

    /// Number of writes since creation
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl PinPersistence for MemoryStorage {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.contents.clone())
    }

    fn write(&mut self, contents: &str) -> Result<()> {
        self.contents = Some(contents.to_string());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_none() {
        let temp_dir = tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("pins.json"));
        assert!(storage.read().unwrap().is_none());
    }

    #[test]
    fn test_file_write_then_read() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("pins.json");
        let mut storage = FileStorage::new(&path);

        storage.write(r#"[{"Pin":"1234","Position":1}]"#).unwrap();

        assert_eq!(
            storage.read().unwrap().as_deref(),
            Some(r#"[{"Pin":"1234","Position":1}]"#)
        );
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_write_replaces_contents() {
        let temp_dir = tempdir().unwrap();
        let mut storage = FileStorage::new(temp_dir.path().join("pins.json"));

        storage.write("[]").unwrap();
        storage.write(r#"[{"Pin":"4321","Position":2}]"#).unwrap();

        assert_eq!(
            storage.read().unwrap().as_deref(),
            Some(r#"[{"Pin":"4321","Position":2}]"#)
        );
    }

    #[test]
    fn test_memory_storage_counts_writes() {
        let mut storage = MemoryStorage::with_contents("[]");
        assert_eq!(storage.read().unwrap().as_deref(), Some("[]"));

        storage.write("x").unwrap();
        storage.write("y").unwrap();
        assert_eq!(storage.contents(), Some("y"));
        assert_eq!(storage.write_count(), 2);
    }
}
