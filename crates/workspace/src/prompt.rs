//! Per-workspace `PromptConfig` store — `prompt.json`.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use sa_contextpack::PromptConfig;
use sa_domain::error::{Error, Result};

pub struct PromptStore {
    path: PathBuf,
    config: RwLock<PromptConfig>,
}

impl PromptStore {
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let path = workspace_root.join("prompt.json");
        let config = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            PromptConfig::default()
        };
        Ok(Self {
            path,
            config: RwLock::new(config),
        })
    }

    pub fn get(&self) -> PromptConfig {
        self.config.read().clone()
    }

    pub fn update(&self, patch: PromptPatch) -> Result<PromptConfig> {
        let mut config = self.config.write();
        if let Some(v) = patch.instructions {
            config.instructions = v;
        }
        if let Some(v) = patch.include_workspace_metadata {
            config.include_workspace_metadata = v;
        }
        if let Some(v) = patch.include_system_info {
            config.include_system_info = v;
        }
        if let Some(v) = patch.include_date_time {
            config.include_date_time = v;
        }
        if let Some(v) = patch.include_tools {
            config.include_tools = v;
        }
        if let Some(v) = patch.include_files {
            config.include_files = v;
        }
        if let Some(v) = patch.include_dynamic_context {
            config.include_dynamic_context = v;
        }
        let snapshot = config.clone();
        drop(config);
        self.flush(&snapshot)?;
        Ok(snapshot)
    }

    fn flush(&self, config: &PromptConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Other(format!("serializing prompt.json: {e}")))?;
        std::fs::write(&self.path, json).map_err(Error::Io)?;
        Ok(())
    }
}

/// Partial update for `WorkspaceManager::updateConfig`; `None` fields are
/// left untouched.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct PromptPatch {
    pub instructions: Option<String>,
    pub include_workspace_metadata: Option<bool>,
    pub include_system_info: Option<bool>,
    pub include_date_time: Option<bool>,
    pub include_tools: Option<bool>,
    pub include_files: Option<bool>,
    pub include_dynamic_context: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_all_sections_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let store = PromptStore::load(dir.path()).unwrap();
        assert!(store.get().include_tools);
    }

    #[test]
    fn partial_update_only_touches_named_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = PromptStore::load(dir.path()).unwrap();
        store
            .update(PromptPatch {
                include_tools: Some(false),
                ..Default::default()
            })
            .unwrap();
        let config = store.get();
        assert!(!config.include_tools);
        assert!(config.include_files);
    }
}
