//! Atomic file operations for journal writes.
//!
//! A daily note is always replaced in one step: the new content goes to a
//! sibling temp file, is synced to disk, and is renamed over the original.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Temp path next to `path`: `2024-03-01.md` becomes `2024-03-01.md.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write content to a file atomically.
///
/// If any step fails, the original file (if any) remains untouched and the
/// temp file is removed.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let temp_path = temp_path(path);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let result = write_synced(&temp_path, content).and_then(|()| fs::rename(&temp_path, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}

fn write_synced(path: &Path, content: &str) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(content.as_bytes())?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

/// Read a document, treating invalid UTF-8 as an I/O error.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_document(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("2024-03-01.md");

        atomic_write(&path, "# Journal\n- 09:00 a\n").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# Journal\n- 09:00 a\n");
        assert!(!temp_dir.path().join("2024-03-01.md.tmp").exists());
    }

    #[test]
    fn test_atomic_write_replaces_and_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Daily").join("2024-03-01.md");

        atomic_write(&path, "old").unwrap();
        atomic_write(&path, "new").unwrap();

        assert_eq!(read_document(&path).unwrap(), "new");
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("2024-03-01.md");
        fs::create_dir_all(path.join("occupied")).unwrap();

        assert!(atomic_write(&path, "new").is_err());

        assert!(path.join("occupied").is_dir());
        assert!(!temp_dir.path().join("2024-03-01.md.tmp").exists());
    }

    #[test]
    fn test_temp_path_keeps_extension() {
        assert_eq!(
            temp_path(Path::new("/v/2024-03-01.md")),
            PathBuf::from("/v/2024-03-01.md.tmp")
        );
    }
}
