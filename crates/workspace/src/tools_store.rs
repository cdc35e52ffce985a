//! Per-workspace `ToolConfigSet` store — `tools/config-sets.json`.
//!
//! Generalizes `domain::config::McpConfig`'s "one implicit server list"
//! into named sets plus one active set name, per SPEC_FULL §C.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use sa_domain::config::ToolConfigSet;
use sa_domain::error::{Error, Result};

const DEFAULT_SET: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolConfigStoreData {
    #[serde(default)]
    sets: HashMap<String, ToolConfigSet>,
    active: String,
}

impl Default for ToolConfigStoreData {
    fn default() -> Self {
        let mut sets = HashMap::new();
        sets.insert(DEFAULT_SET.to_string(), ToolConfigSet::default());
        Self {
            sets,
            active: DEFAULT_SET.to_string(),
        }
    }
}

pub struct ToolConfigStore {
    path: PathBuf,
    data: RwLock<ToolConfigStoreData>,
}

impl ToolConfigStore {
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let dir = workspace_root.join("tools");
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;
        let path = dir.join("config-sets.json");
        let data = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            ToolConfigStoreData::default()
        };
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn flush(&self, data: &ToolConfigStoreData) -> Result<()> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| Error::Other(format!("serializing config-sets.json: {e}")))?;
        std::fs::write(&self.path, json).map_err(Error::Io)?;
        Ok(())
    }

    /// The currently active `ToolConfigSet`. Invariant: `active` always
    /// refers to an existing set, so this never returns `None`.
    pub fn active_set(&self) -> ToolConfigSet {
        let data = self.data.read();
        data.sets
            .get(&data.active)
            .cloned()
            .unwrap_or_default()
    }

    pub fn active_name(&self) -> String {
        self.data.read().active.clone()
    }

    pub fn list_sets(&self) -> Vec<String> {
        self.data.read().sets.keys().cloned().collect()
    }

    pub fn create_set(&self, name: &str, set: ToolConfigSet) -> Result<()> {
        let mut data = self.data.write();
        if data.sets.contains_key(name) {
            return Err(Error::Conflict(format!("tool config set '{name}' already exists")));
        }
        data.sets.insert(name.to_string(), set);
        let snapshot = data.clone();
        drop(data);
        self.flush(&snapshot)
    }

    pub fn rename_set(&self, old_name: &str, new_name: &str) -> Result<()> {
        let mut data = self.data.write();
        if !data.sets.contains_key(old_name) {
            return Err(Error::NotFound(format!("tool config set '{old_name}' not found")));
        }
        if data.sets.contains_key(new_name) {
            return Err(Error::Conflict(format!("tool config set '{new_name}' already exists")));
        }
        let set = data.sets.remove(old_name).unwrap();
        data.sets.insert(new_name.to_string(), set);
        if data.active == old_name {
            data.active = new_name.to_string();
        }
        let snapshot = data.clone();
        drop(data);
        self.flush(&snapshot)
    }

    pub fn delete_set(&self, name: &str) -> Result<()> {
        let mut data = self.data.write();
        if data.active == name {
            return Err(Error::Conflict(format!("cannot delete the active set '{name}'")));
        }
        if data.sets.remove(name).is_none() {
            return Err(Error::NotFound(format!("tool config set '{name}' not found")));
        }
        let snapshot = data.clone();
        drop(data);
        self.flush(&snapshot)
    }

    /// Invariant: active name must refer to an existing set.
    pub fn set_active(&self, name: &str) -> Result<()> {
        let mut data = self.data.write();
        if !data.sets.contains_key(name) {
            return Err(Error::NotFound(format!("tool config set '{name}' not found")));
        }
        data.active = name.to_string();
        let snapshot = data.clone();
        drop(data);
        self.flush(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_one_empty_active_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = ToolConfigStore::load(dir.path()).unwrap();
        assert_eq!(store.active_name(), DEFAULT_SET);
        assert!(store.active_set().servers.is_empty());
    }

    #[test]
    fn set_active_to_unknown_set_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ToolConfigStore::load(dir.path()).unwrap();
        let err = store.set_active("missing").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn cannot_delete_active_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = ToolConfigStore::load(dir.path()).unwrap();
        let err = store.delete_set(DEFAULT_SET).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn create_switch_and_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ToolConfigStore::load(dir.path()).unwrap();
        store.create_set("alt", ToolConfigSet::default()).unwrap();
        store.set_active("alt").unwrap();
        assert_eq!(store.active_name(), "alt");
        store.delete_set(DEFAULT_SET).unwrap();
        assert_eq!(store.list_sets(), vec!["alt".to_string()]);
    }
}
