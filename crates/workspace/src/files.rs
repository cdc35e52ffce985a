//! Per-workspace arbitrary-file store — `files/`.
//!
//! Uses mtime + size + sha256 for cache invalidation, over an arbitrary
//! workspace-relative file name rather than a fixed file list.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};

use sa_contextpack::WorkspaceFile;
use sa_domain::error::{Error, Result};
use sa_domain::trace::TraceEvent;

#[derive(Debug, Clone)]
struct CachedFile {
    content: String,
    hash: String,
    modified: SystemTime,
    size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileHash {
    pub sha256: String,
    pub size: u64,
}

/// Reads and caches the files under a workspace's `files/` directory.
pub struct FilesStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, CachedFile>>,
}

impl FilesStore {
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let dir = workspace_root.join("files");
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;
        Ok(Self {
            dir,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Every workspace-relative filename currently present on disk.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.dir)
            .into_iter()
            .flatten()
            .flatten()
            .filter(|e| e.path().is_file())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    pub fn read_file(&self, name: &str) -> Option<String> {
        let path = self.dir.join(name);
        if !path.exists() {
            return None;
        }
        let metadata = std::fs::metadata(&path).ok()?;
        let modified = metadata.modified().ok()?;
        let size = metadata.len();

        {
            let cache = self.cache.read();
            if let Some(cached) = cache.get(name) {
                if cached.modified == modified && cached.size == size {
                    TraceEvent::WorkspaceFileRead {
                        filename: name.to_string(),
                        raw_chars: cached.content.len(),
                        cache_hit: true,
                    }
                    .emit();
                    return Some(cached.content.clone());
                }
            }
        }

        let content = std::fs::read_to_string(&path).ok()?;
        let hash = {
            let mut hasher = Sha256::new();
            hasher.update(content.as_bytes());
            format!("{:x}", hasher.finalize())
        };
        let raw_chars = content.len();

        self.cache.write().insert(
            name.to_string(),
            CachedFile {
                content: content.clone(),
                hash,
                modified,
                size,
            },
        );

        TraceEvent::WorkspaceFileRead {
            filename: name.to_string(),
            raw_chars,
            cache_hit: false,
        }
        .emit();

        Some(content)
    }

    pub fn write_file(&self, name: &str, content: &str) -> Result<()> {
        std::fs::write(self.dir.join(name), content).map_err(Error::Io)?;
        self.cache.write().remove(name);
        Ok(())
    }

    pub fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.dir.join(name);
        if path.exists() {
            std::fs::remove_file(&path).map_err(Error::Io)?;
        }
        self.cache.write().remove(name);
        Ok(())
    }

    pub fn file_hash(&self, name: &str) -> Option<FileHash> {
        self.cache.read().get(name).map(|c| FileHash {
            sha256: c.hash.clone(),
            size: c.size,
        })
    }

    /// Read every file currently present, for `buildContext`'s
    /// `include-files` section.
    pub fn read_all(&self) -> Vec<WorkspaceFile> {
        self.list_names()
            .into_iter()
            .map(|name| {
                let content = self.read_file(&name);
                WorkspaceFile { name, content }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesStore::load(dir.path()).unwrap();
        store.write_file("AGENTS.md", "hello").unwrap();
        assert_eq!(store.read_file("AGENTS.md").as_deref(), Some("hello"));
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesStore::load(dir.path()).unwrap();
        assert_eq!(store.read_file("missing.md"), None);
    }

    #[test]
    fn list_names_reflects_disk_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesStore::load(dir.path()).unwrap();
        store.write_file("a.md", "1").unwrap();
        store.write_file("b.md", "2").unwrap();
        assert_eq!(store.list_names(), vec!["a.md".to_string(), "b.md".to_string()]);
    }
}
