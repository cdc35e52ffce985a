//! `RootManager` (C1) — owns the on-disk root directory and the registry
//! of workspaces rooted under it.
//!
//! A small state file, not a directory scan, is the source of truth:
//! workspace identity lives in `root.json`, and a `.mandrake-workspace.json`
//! marker at each workspace's path is what `adoptWorkspace` checks for.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use sa_domain::error::{Error, Result};

use crate::manager::WorkspaceManager;

const MARKER_FILE: &str = ".mandrake-workspace.json";

/// One entry of `root.json`: `id -> {name, path, description, last_opened}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub last_opened: DateTime<Utc>,
}

/// Marker file written at a workspace's root path, proving it was created
/// or adopted by this system.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceMarker {
    workspace_id: String,
    name: String,
    created_at: DateTime<Utc>,
}

/// Summary returned by `listWorkspaces`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSummary {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub description: Option<String>,
    pub last_opened: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct RootRegistry {
    #[serde(default)]
    workspaces: HashMap<String, WorkspaceEntry>,
}

/// Owns `$ROOT_PATH` and the workspace registry (`root.json`).
///
/// `init()` is idempotent — a second call just re-reads the same file.
/// `getWorkspace`/`createWorkspace`/`adoptWorkspace`/`deleteWorkspace` are
/// the operations `ServiceRegistry` drives; this type does no caching of
/// its own beyond the in-memory mirror of `root.json` (the registry crate
/// owns the `WorkspaceManager` cache).
pub struct RootManager {
    root_path: PathBuf,
    registry: RwLock<RootRegistry>,
    initialized: RwLock<bool>,
}

impl RootManager {
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            registry: RwLock::new(RootRegistry::default()),
            initialized: RwLock::new(false),
        }
    }

    fn registry_path(&self) -> PathBuf {
        self.root_path.join("root.json")
    }

    /// Idempotent: the second call is a no-op (registry already loaded).
    pub fn init(&self) -> Result<()> {
        if *self.initialized.read() {
            return Ok(());
        }

        std::fs::create_dir_all(&self.root_path).map_err(Error::Io)?;
        std::fs::create_dir_all(self.root_path.join("workspaces")).map_err(Error::Io)?;

        let path = self.registry_path();
        let loaded = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            RootRegistry::default()
        };

        *self.registry.write() = loaded;
        *self.initialized.write() = true;

        tracing::info!(root_path = %self.root_path.display(), "root manager initialized");
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&*self.registry.read())
            .map_err(|e| Error::Other(format!("serializing root.json: {e}")))?;
        std::fs::write(self.registry_path(), json).map_err(Error::Io)?;
        Ok(())
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn list_workspaces(&self) -> Vec<WorkspaceSummary> {
        self.registry
            .read()
            .workspaces
            .values()
            .map(|e| WorkspaceSummary {
                id: e.id.clone(),
                name: e.name.clone(),
                path: e.path.clone(),
                description: e.description.clone(),
                last_opened: e.last_opened,
            })
            .collect()
    }

    /// Construct a `WorkspaceManager` for an already-registered workspace.
    pub fn get_workspace(&self, workspace_id: &str) -> Result<WorkspaceManager> {
        let mut registry = self.registry.write();
        let entry = registry
            .workspaces
            .get_mut(workspace_id)
            .ok_or_else(|| Error::NotFound(format!("workspace '{workspace_id}' not found")))?;
        entry.last_opened = Utc::now();
        let entry = entry.clone();
        drop(registry);
        self.flush()?;
        WorkspaceManager::open(entry)
    }

    /// Creates a new workspace directory and marker file, then registers it.
    pub fn create_workspace(
        &self,
        name: &str,
        description: Option<String>,
        path: Option<PathBuf>,
    ) -> Result<WorkspaceManager> {
        validate_name(name)?;
        self.ensure_name_unique(name)?;

        let path = path.unwrap_or_else(|| self.root_path.join("workspaces").join(name));
        std::fs::create_dir_all(&path).map_err(Error::Io)?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let marker = WorkspaceMarker {
            workspace_id: id.clone(),
            name: name.to_string(),
            created_at: now,
        };
        let marker_json = serde_json::to_string_pretty(&marker)
            .map_err(|e| Error::Other(format!("serializing workspace marker: {e}")))?;
        std::fs::write(path.join(MARKER_FILE), marker_json).map_err(Error::Io)?;

        let entry = WorkspaceEntry {
            id: id.clone(),
            name: name.to_string(),
            path,
            description,
            metadata: HashMap::new(),
            created_at: now,
            last_opened: now,
        };
        self.registry.write().workspaces.insert(id, entry.clone());
        self.flush()?;

        WorkspaceManager::open(entry)
    }

    /// Adopts an existing on-disk workspace: succeeds only if the marker
    /// file is already present at `path`.
    pub fn adopt_workspace(
        &self,
        name: &str,
        path: PathBuf,
        description: Option<String>,
    ) -> Result<WorkspaceManager> {
        validate_name(name)?;
        self.ensure_name_unique(name)?;

        let marker_path = path.join(MARKER_FILE);
        if !marker_path.exists() {
            return Err(Error::NotFound(format!(
                "no workspace marker found at '{}'",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(&marker_path).map_err(Error::Io)?;
        let marker: WorkspaceMarker =
            serde_json::from_str(&raw).map_err(|e| Error::Other(format!("corrupt workspace marker: {e}")))?;

        let now = Utc::now();
        let entry = WorkspaceEntry {
            id: marker.workspace_id,
            name: name.to_string(),
            path,
            description,
            metadata: HashMap::new(),
            created_at: marker.created_at,
            last_opened: now,
        };
        self.registry
            .write()
            .workspaces
            .insert(entry.id.clone(), entry.clone());
        self.flush()?;

        WorkspaceManager::open(entry)
    }

    pub fn delete_workspace(&self, name: &str) -> Result<()> {
        let id = {
            let registry = self.registry.read();
            registry
                .workspaces
                .values()
                .find(|e| e.name == name)
                .map(|e| e.id.clone())
                .ok_or_else(|| Error::NotFound(format!("workspace '{name}' not found")))?
        };
        self.registry.write().workspaces.remove(&id);
        self.flush()
    }

    fn ensure_name_unique(&self, name: &str) -> Result<()> {
        if self.registry.read().workspaces.values().any(|e| e.name == name) {
            return Err(Error::Conflict(format!("workspace name '{name}' already in use")));
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::BadRequest(format!(
            "workspace name '{name}' must match ^[A-Za-z0-9_-]+$"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let root = RootManager::new(dir.path().to_path_buf());
        root.init().unwrap();

        let created = root.create_workspace("demo", None, None).unwrap();
        let fetched = root.get_workspace(&created.id).unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.name, "demo");
    }

    #[test]
    fn duplicate_name_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let root = RootManager::new(dir.path().to_path_buf());
        root.init().unwrap();
        root.create_workspace("demo", None, None).unwrap();
        let err = root.create_workspace("demo", None, None).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn adopt_without_marker_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let root = RootManager::new(dir.path().to_path_buf());
        root.init().unwrap();
        let adopt_path = dir.path().join("unmanaged");
        std::fs::create_dir_all(&adopt_path).unwrap();
        let err = root
            .adopt_workspace("adopted", adopt_path, None)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn adopt_after_create_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let root = RootManager::new(dir.path().to_path_buf());
        root.init().unwrap();
        let created = root.create_workspace("source", None, None).unwrap();
        let path = created.paths_root().to_path_buf();
        root.delete_workspace("source").unwrap();

        let adopted = root.adopt_workspace("adopted", path, None).unwrap();
        assert_eq!(adopted.id, created.id);
    }

    #[test]
    fn invalid_name_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let root = RootManager::new(dir.path().to_path_buf());
        root.init().unwrap();
        let err = root.create_workspace("not valid!", None, None).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let root = RootManager::new(dir.path().to_path_buf());
        root.init().unwrap();
        let err = root.delete_workspace("nope").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
