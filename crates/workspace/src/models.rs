//! Per-workspace model/provider role mapping — `models.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use sa_domain::error::{Error, Result};

/// `roleName -> "provider_id/model_name"`, consulted by `SessionCoordinator`
/// when picking a model for a turn.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelsConfig {
    #[serde(default)]
    pub roles: HashMap<String, String>,
}

pub struct ModelsStore {
    path: PathBuf,
    config: RwLock<ModelsConfig>,
}

impl ModelsStore {
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let path = workspace_root.join("models.json");
        let config = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            ModelsConfig::default()
        };
        Ok(Self {
            path,
            config: RwLock::new(config),
        })
    }

    pub fn get(&self) -> ModelsConfig {
        self.config.read().clone()
    }

    pub fn model_for_role(&self, role: &str) -> Option<String> {
        self.config.read().roles.get(role).cloned()
    }

    pub fn set_role(&self, role: &str, model: &str) -> Result<()> {
        let mut config = self.config.write();
        config.roles.insert(role.to_string(), model.to_string());
        let snapshot = config.clone();
        drop(config);
        self.flush(&snapshot)
    }

    fn flush(&self, config: &ModelsConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Other(format!("serializing models.json: {e}")))?;
        std::fs::write(&self.path, json).map_err(Error::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelsStore::load(dir.path()).unwrap();
        store.set_role("executor", "anthropic/claude-sonnet").unwrap();
        assert_eq!(
            store.model_for_role("executor").as_deref(),
            Some("anthropic/claude-sonnet")
        );
    }
}
