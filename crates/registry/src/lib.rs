//! `sa-registry` — `ServiceRegistry` (C5): the process-singleton cache and
//! lifecycle manager for `RootManager`, `WorkspaceManager`, `ToolServerPool`,
//! and `SessionCoordinator` instances.

mod cache;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use sa_contextpack::ContextPackBuilder;
use sa_coordinator::{SessionCoordinator, SessionCoordinatorDeps};
use sa_domain::error::{Error, Result};
use sa_providers::ProviderRegistry;
use sa_tools::ToolServerPool;
use sa_workspace::{RootManager, WorkspaceManager};

use cache::Cache;

const DEFAULT_MAX_CONCURRENT_SESSIONS: usize = 10;
const DEFAULT_IDLE_THRESHOLD_MINUTES: i64 = 30;

/// Tunables read once at construction (`maxConcurrentSessions`
/// and `idleThreshold`).
#[derive(Debug, Clone)]
pub struct RegistryTunables {
    pub max_concurrent_sessions: usize,
    pub idle_threshold: ChronoDuration,
    pub context_file_max_chars: usize,
    pub context_total_max_chars: usize,
}

impl Default for RegistryTunables {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: DEFAULT_MAX_CONCURRENT_SESSIONS,
            idle_threshold: ChronoDuration::minutes(DEFAULT_IDLE_THRESHOLD_MINUTES),
            context_file_max_chars: 20_000,
            context_total_max_chars: 24_000,
        }
    }
}

/// Hands out cached, lazily-initialized managers keyed by identity. Every
/// public getter is safe to call concurrently: misses for the same key
/// serialize (the constructor runs once), misses for different keys do
/// not block each other beyond the brief map lookup.
pub struct ServiceRegistry {
    root_path: PathBuf,
    providers: Arc<ProviderRegistry>,
    tunables: RegistryTunables,

    root: Cache<(), Arc<RootManager>>,
    workspaces: Cache<String, Arc<WorkspaceManager>>,
    pools: Cache<String, Arc<ToolServerPool>>,
    sessions: Cache<(String, String), Arc<SessionCoordinator>>,
}

impl ServiceRegistry {
    pub fn new(root_path: PathBuf, providers: Arc<ProviderRegistry>) -> Self {
        Self::with_tunables(root_path, providers, RegistryTunables::default())
    }

    pub fn with_tunables(root_path: PathBuf, providers: Arc<ProviderRegistry>, tunables: RegistryTunables) -> Self {
        Self {
            root_path,
            providers,
            tunables,
            root: Cache::default(),
            workspaces: Cache::default(),
            pools: Cache::default(),
            sessions: Cache::default(),
        }
    }

    /// First call constructs and `init()`s a `RootManager` at the
    /// configured root path; later calls return the cached instance.
    pub async fn get_root(&self) -> Result<Arc<RootManager>> {
        let root_path = self.root_path.clone();
        self.root
            .get_or_try_init((), || async move {
                let manager = RootManager::new(root_path);
                manager.init()?;
                Ok::<_, Error>(Arc::new(manager))
            })
            .await
    }

    /// Cache hit returns the cached manager. On a miss, consults
    /// `RootManager::get_workspace`; if that reports `NotFound` and `path`
    /// was supplied, tries `adopt_workspace` then falls back to
    /// `create_workspace`, both under a derived name.
    pub async fn get_workspace(&self, workspace_id: &str, path: Option<PathBuf>) -> Result<Arc<WorkspaceManager>> {
        let root = self.get_root().await?;
        let key = workspace_id.to_string();
        let workspace_id = workspace_id.to_string();
        self.workspaces
            .get_or_try_init(key, || async move {
                match root.get_workspace(&workspace_id) {
                    Ok(wm) => Ok(Arc::new(wm)),
                    Err(Error::NotFound(_)) if path.is_some() => {
                        let path = path.unwrap();
                        let derived_name = derived_workspace_name(&workspace_id);
                        let wm = root
                            .adopt_workspace(&derived_name, path.clone(), None)
                            .or_else(|_| root.create_workspace(&derived_name, None, Some(path)))?;
                        Ok(Arc::new(wm))
                    }
                    Err(e) => Err(e),
                }
            })
            .await
    }

    /// On a miss, loads the workspace's active tool-config set and starts
    /// every non-disabled server in it. Startup failures are logged by the
    /// pool itself and never abort caching it.
    pub async fn get_tool_pool(&self, workspace_id: &str, path: Option<PathBuf>) -> Result<Arc<ToolServerPool>> {
        let workspace = self.get_workspace(workspace_id, path).await?;
        let key = workspace_id.to_string();
        let workspace_id = workspace_id.to_string();
        self.pools
            .get_or_try_init(key, || async move {
                let set = workspace.tools.active_set();
                Ok::<_, Error>(Arc::new(ToolServerPool::from_config_set(workspace_id, &set).await))
            })
            .await
    }

    /// On a miss: evicts the LRU session if the concurrency cap is already
    /// reached, loads the workspace and its tool pool, then constructs a
    /// `SessionCoordinator` wired to the workspace's sub-managers.
    pub async fn get_session_coordinator(
        &self,
        workspace_id: &str,
        path: Option<PathBuf>,
        session_id: &str,
    ) -> Result<Arc<SessionCoordinator>> {
        let key = (workspace_id.to_string(), session_id.to_string());
        if !self.sessions.contains(&key).await && self.sessions.len().await >= self.tunables.max_concurrent_sessions {
            if let Some((evict_workspace, evict_session)) = self.sessions.lru_key().await {
                self.release_session(&evict_workspace, &evict_session).await;
            }
        }

        let workspace = self.get_workspace(workspace_id, path.clone()).await?;
        let pool = self.get_tool_pool(workspace_id, path).await?;
        let description = self.workspace_description(workspace_id).await;
        let providers = Arc::clone(&self.providers);
        let builder = ContextPackBuilder::new(self.tunables.context_file_max_chars, self.tunables.context_total_max_chars);
        let workspace_id_owned = workspace_id.to_string();
        let session_id_owned = session_id.to_string();

        self.sessions
            .get_or_try_init(key, move || async move {
                let deps = SessionCoordinatorDeps {
                    workspace_id: workspace_id_owned.clone(),
                    workspace_name: workspace.name.clone(),
                    workspace_path: workspace.paths_root().display().to_string(),
                    workspace_description: description,
                    session_id: session_id_owned,
                    sessions: Arc::clone(&workspace.sessions),
                    turns: Arc::clone(&workspace.turns),
                    prompt: Arc::clone(&workspace.prompt),
                    tools: pool,
                    models: Arc::clone(&workspace.models),
                    files: Arc::clone(&workspace.files),
                    dynamic: Arc::clone(&workspace.dynamic),
                    providers,
                    context_builder: builder,
                };
                Ok::<_, Error>(Arc::new(SessionCoordinator::new(deps)))
            })
            .await
    }

    async fn workspace_description(&self, workspace_id: &str) -> Option<String> {
        let root = self.get_root().await.ok()?;
        root.list_workspaces()
            .into_iter()
            .find(|w| w.id == workspace_id)
            .and_then(|w| w.description)
    }

    /// Calls `coordinator.cleanup()` then drops it from the cache. A no-op
    /// if the session isn't cached.
    pub async fn release_session(&self, workspace_id: &str, session_id: &str) {
        let key = (workspace_id.to_string(), session_id.to_string());
        if let Some(coordinator) = self.sessions.remove(&key).await {
            coordinator.cleanup();
        }
    }

    /// Calls `pool.cleanup()` then drops it from the cache. Used when a
    /// workspace's active tool-config set changes and the running pool no
    /// longer matches it. A no-op if no pool is cached for `workspace_id`.
    pub async fn release_tool_pool(&self, workspace_id: &str) {
        if let Some(pool) = self.pools.remove(&workspace_id.to_string()).await {
            pool.cleanup().await;
        }
    }

    /// Releases every cached session for `workspace_id`, then stops and
    /// cleans up its tool pool, then drops the workspace entry itself.
    pub async fn release_workspace(&self, workspace_id: &str) {
        let session_keys: Vec<(String, String)> = self
            .sessions
            .keys()
            .await
            .into_iter()
            .filter(|(w, _)| w == workspace_id)
            .collect();
        for (w, s) in session_keys {
            self.release_session(&w, &s).await;
        }

        if let Some(pool) = self.pools.remove(&workspace_id.to_string()).await {
            pool.cleanup().await;
        }

        self.workspaces.remove(&workspace_id.to_string()).await;
    }

    /// Drops the cached root entry. No filesystem mutation.
    pub async fn release_root(&self) {
        self.root.remove(&()).await;
    }

    /// Idle sweep, in dependency order: sessions, then
    /// workspaces left with no remaining sessions, then root.
    pub async fn perform_cleanup(&self) {
        let now = chrono::Utc::now();
        let threshold = self.tunables.idle_threshold;

        let idle_sessions = self
            .sessions
            .idle_keys(now, threshold, |c| c.is_busy())
            .await;
        for (w, s) in idle_sessions {
            tracing::info!(workspace_id = %w, session_id = %s, "releasing idle session");
            self.release_session(&w, &s).await;
        }

        let remaining_workspace_ids: std::collections::HashSet<String> =
            self.sessions.keys().await.into_iter().map(|(w, _)| w).collect();
        let idle_workspaces = self
            .workspaces
            .idle_keys(now, threshold, |_| false)
            .await
            .into_iter()
            .filter(|id| !remaining_workspace_ids.contains(id));
        for workspace_id in idle_workspaces {
            tracing::info!(workspace_id = %workspace_id, "releasing idle workspace");
            self.release_workspace(&workspace_id).await;
        }

        if self.workspaces.is_empty().await {
            let root_idle = self
                .root
                .idle_keys(now, threshold, |_| false)
                .await;
            if !root_idle.is_empty() {
                tracing::info!("releasing idle root");
                self.release_root().await;
            }
        }
    }

    /// Testing hook: releases everything and clears every cache slot.
    pub async fn reset(&self) {
        for coordinator in self.sessions.clear().await {
            coordinator.cleanup();
        }
        for pool in self.pools.clear().await {
            pool.cleanup().await;
        }
        self.workspaces.clear().await;
        self.root.clear().await;
    }
}

fn derived_workspace_name(workspace_id: &str) -> String {
    let prefix: String = workspace_id.chars().take(8).collect();
    format!("workspace-{prefix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_domain::config::LlmConfig;

    fn registry(root_path: PathBuf) -> ServiceRegistry {
        let providers = Arc::new(ProviderRegistry::from_config(&LlmConfig::default()).unwrap());
        ServiceRegistry::new(root_path, providers)
    }

    #[tokio::test]
    async fn get_root_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path().to_path_buf());
        let a = registry.get_root().await.unwrap();
        let b = registry.get_root().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn get_workspace_creates_from_path_on_miss() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path().to_path_buf());
        let ws_path = dir.path().join("external");
        std::fs::create_dir_all(&ws_path).unwrap();

        let ws = registry
            .get_workspace("req-id-1234", Some(ws_path.clone()))
            .await
            .unwrap();
        assert_eq!(ws.paths_root(), ws_path);

        let again = registry.get_workspace("req-id-1234", None).await.unwrap();
        assert!(Arc::ptr_eq(&ws, &again));
    }

    #[tokio::test]
    async fn get_workspace_missing_without_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path().to_path_buf());
        let err = registry.get_workspace("nope", None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn session_cap_evicts_lru() {
        let dir = tempfile::tempdir().unwrap();
        let mut tunables = RegistryTunables::default();
        tunables.max_concurrent_sessions = 1;
        let providers = Arc::new(ProviderRegistry::from_config(&LlmConfig::default()).unwrap());
        let registry = ServiceRegistry::with_tunables(dir.path().to_path_buf(), providers, tunables);

        let ws_path = dir.path().join("ws");
        std::fs::create_dir_all(&ws_path).unwrap();
        registry.get_workspace("ws1", Some(ws_path.clone())).await.unwrap();

        registry
            .get_session_coordinator("ws1", None, "sess-a")
            .await
            .unwrap();
        registry
            .get_session_coordinator("ws1", None, "sess-b")
            .await
            .unwrap();

        assert_eq!(registry.sessions.len().await, 1);
        assert!(!registry.sessions.contains(&("ws1".to_string(), "sess-a".to_string())).await);
    }

    #[tokio::test]
    async fn reset_clears_every_cache() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path().to_path_buf());
        registry.get_root().await.unwrap();
        let ws_path = dir.path().join("ws");
        std::fs::create_dir_all(&ws_path).unwrap();
        registry.get_workspace("ws1", Some(ws_path)).await.unwrap();

        registry.reset().await;
        assert!(registry.workspaces.is_empty().await);
    }
}
