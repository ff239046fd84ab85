//! Filesystem abstraction used by [`LocalStore`](crate::LocalStore).

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Minimal synchronous filesystem surface needed by the local store.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write `data` to `path`, creating parent directories as needed.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Every regular file below `dir`, relative to `dir`, sorted.
    fn walk_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// [`FileSystem`] backed by the host operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;
        // Readers never observe a partially written file.
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn walk_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(dir) {
                files.push(rel.to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_parents_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.bin");
        OsFileSystem.write(&path, b"payload").unwrap();
        assert!(OsFileSystem.exists(&path));
        assert_eq!(OsFileSystem.read(&path).unwrap(), b"payload");
    }

    #[test]
    fn write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file");
        OsFileSystem.write(&path, b"one").unwrap();
        OsFileSystem.write(&path, b"two").unwrap();
        assert_eq!(OsFileSystem.read(&path).unwrap(), b"two");
    }

    #[test]
    fn walk_lists_relative_sorted_files_only() {
        let dir = tempfile::tempdir().unwrap();
        OsFileSystem.write(&dir.path().join("z/last"), b"").unwrap();
        OsFileSystem.write(&dir.path().join("a/first"), b"").unwrap();
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();

        let files = OsFileSystem.walk_files(dir.path()).unwrap();
        assert_eq!(files, vec![PathBuf::from("a/first"), PathBuf::from("z/last")]);
    }

    #[test]
    fn walk_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OsFileSystem.walk_files(&dir.path().join("nope")).is_err());
    }
}
