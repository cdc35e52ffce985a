//! Per-workspace `DynamicContext` store — `dynamic-contexts.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use sa_domain::error::{Error, Result};

/// `{ contextId, serverId, methodName, params, refresh:{enabled} }` — a
/// named tool invocation the coordinator runs while assembling context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicContext {
    pub context_id: String,
    pub server_id: String,
    pub method_name: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub refresh: RefreshPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RefreshPolicy {
    pub enabled: bool,
}

pub struct DynamicContextStore {
    path: PathBuf,
    contexts: RwLock<HashMap<String, DynamicContext>>,
}

impl DynamicContextStore {
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let path = workspace_root.join("dynamic-contexts.json");
        let contexts = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            contexts: RwLock::new(contexts),
        })
    }

    fn flush(&self, contexts: &HashMap<String, DynamicContext>) -> Result<()> {
        let json = serde_json::to_string_pretty(contexts)
            .map_err(|e| Error::Other(format!("serializing dynamic-contexts.json: {e}")))?;
        std::fs::write(&self.path, json).map_err(Error::Io)?;
        Ok(())
    }

    pub fn list(&self) -> Vec<DynamicContext> {
        self.contexts.read().values().cloned().collect()
    }

    pub fn get(&self, context_id: &str) -> Option<DynamicContext> {
        self.contexts.read().get(context_id).cloned()
    }

    pub fn upsert(&self, context: DynamicContext) -> Result<()> {
        let mut contexts = self.contexts.write();
        contexts.insert(context.context_id.clone(), context);
        let snapshot = contexts.clone();
        drop(contexts);
        self.flush(&snapshot)
    }

    pub fn delete(&self, context_id: &str) -> Result<()> {
        let mut contexts = self.contexts.write();
        if contexts.remove(context_id).is_none() {
            return Err(Error::NotFound(format!("dynamic context '{context_id}' not found")));
        }
        let snapshot = contexts.clone();
        drop(contexts);
        self.flush(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_list_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = DynamicContextStore::load(dir.path()).unwrap();
        store
            .upsert(DynamicContext {
                context_id: "c1".into(),
                server_id: "fs".into(),
                method_name: "status".into(),
                params: Value::Null,
                refresh: RefreshPolicy { enabled: true },
            })
            .unwrap();
        assert_eq!(store.list().len(), 1);
        assert!(store.get("c1").is_some());
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DynamicContextStore::load(dir.path()).unwrap();
        let err = store.delete("missing").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
