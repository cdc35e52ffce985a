//! `WorkspaceManager` (part of C2) — a single open workspace and its
//! sub-managers: sessions, prompt, tools, models, files, dynamic contexts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sa_contextpack::PromptConfig;
use sa_domain::config::ToolConfigSet;
use sa_domain::error::Result;
use sa_sessions::{SessionStore, TurnStore};

use crate::dynamic::DynamicContextStore;
use crate::files::FilesStore;
use crate::models::{ModelsConfig, ModelsStore};
use crate::prompt::{PromptPatch, PromptStore};
use crate::root::WorkspaceEntry;
use crate::tools_store::ToolConfigStore;
use serde::Serialize;

/// The effective configuration of a workspace, as returned by `getConfig`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceConfig {
    pub prompt: PromptConfig,
    pub tools: ToolConfigSet,
    pub active_tool_set: String,
    pub models: ModelsConfig,
}

/// A partial update accepted by `updateConfig`; only the populated fields
/// are merged into the workspace's persisted stores.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceConfigPatch {
    pub prompt: Option<PromptPatch>,
    pub model_roles: Vec<(String, String)>,
}

/// One open workspace: identity plus every sub-manager scoped to it.
pub struct WorkspaceManager {
    pub id: String,
    pub name: String,
    path: PathBuf,

    pub sessions: Arc<SessionStore>,
    pub turns: Arc<TurnStore>,
    pub prompt: Arc<PromptStore>,
    pub tools: Arc<ToolConfigStore>,
    pub models: Arc<ModelsStore>,
    pub files: Arc<FilesStore>,
    pub dynamic: Arc<DynamicContextStore>,
}

impl WorkspaceManager {
    /// Opens (creating on-disk structure as needed) every sub-manager for
    /// `entry`. Idempotent: safe to call repeatedly for the same workspace.
    pub fn open(entry: WorkspaceEntry) -> Result<Self> {
        let path = entry.path.clone();
        std::fs::create_dir_all(&path).map_err(sa_domain::error::Error::Io)?;

        let sessions = Arc::new(SessionStore::new(&path)?);
        let turns = Arc::new(TurnStore::new(&sessions.turns_dir())?);
        let prompt = Arc::new(PromptStore::load(&path)?);
        let tools = Arc::new(ToolConfigStore::load(&path)?);
        let models = Arc::new(ModelsStore::load(&path)?);
        let files = Arc::new(FilesStore::load(&path)?);
        let dynamic = Arc::new(DynamicContextStore::load(&path)?);

        Ok(Self {
            id: entry.id,
            name: entry.name,
            path,
            sessions,
            turns,
            prompt,
            tools,
            models,
            files,
            dynamic,
        })
    }

    pub fn paths_root(&self) -> &Path {
        &self.path
    }

    pub fn get_config(&self) -> WorkspaceConfig {
        WorkspaceConfig {
            prompt: self.prompt.get(),
            tools: self.tools.active_set(),
            active_tool_set: self.tools.active_name(),
            models: self.models.get(),
        }
    }

    pub fn update_config(&self, patch: WorkspaceConfigPatch) -> Result<WorkspaceConfig> {
        if let Some(prompt_patch) = patch.prompt {
            self.prompt.update(prompt_patch)?;
        }
        for (role, model) in patch.model_roles {
            self.models.set_role(&role, &model)?;
        }
        Ok(self.get_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn entry(dir: &Path) -> WorkspaceEntry {
        WorkspaceEntry {
            id: "ws1".into(),
            name: "demo".into(),
            path: dir.to_path_buf(),
            description: None,
            metadata: HashMap::new(),
            created_at: Utc::now(),
            last_opened: Utc::now(),
        }
    }

    #[test]
    fn open_creates_every_sub_manager() {
        let dir = tempfile::tempdir().unwrap();
        let ws = WorkspaceManager::open(entry(dir.path())).unwrap();
        assert_eq!(ws.id, "ws1");
        assert_eq!(ws.paths_root(), dir.path());
        assert!(ws.get_config().prompt.include_tools);
    }

    #[test]
    fn update_config_merges_partial_patch() {
        let dir = tempfile::tempdir().unwrap();
        let ws = WorkspaceManager::open(entry(dir.path())).unwrap();
        let config = ws
            .update_config(WorkspaceConfigPatch {
                prompt: Some(PromptPatch {
                    include_files: Some(false),
                    ..Default::default()
                }),
                model_roles: vec![("executor".into(), "anthropic/claude-sonnet".into())],
            })
            .unwrap();
        assert!(!config.prompt.include_files);
        assert!(config.prompt.include_tools);
        assert_eq!(
            config.models.roles.get("executor").map(String::as_str),
            Some("anthropic/claude-sonnet")
        );
    }
}
