//! `ToolServerPool` — per-workspace pool of running tool servers (C3).
//!
//! Starts/stops tool-server processes from a `ToolConfigSet` and exposes
//! the coordination surface `SessionCoordinator`/`ServiceRegistry` use:
//! `startServer`, `stopServer`, `cleanup`, `getServer`, `listAllTools`,
//! `invokeTool`, `getServerStatus`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use sa_domain::config::{McpServerConfig, McpTransportKind, ToolConfigSet};
use crate::protocol::{self, McpToolDef, ToolCallResult, ToolsListResult};
use crate::transport::{McpTransport, SseTransport, StdioTransport, TransportError};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ServerHandle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One running tool-server connection.
pub struct ServerHandle {
    id: String,
    config: McpServerConfig,
    tools: Vec<McpToolDef>,
    transport: Box<dyn McpTransport>,
    logs: SyncMutex<Vec<String>>,
    last_error: SyncMutex<Option<String>>,
}

/// Snapshot returned by `handle.getState()`.
#[derive(Debug, Clone, Serialize)]
pub struct ServerState {
    pub logs: Vec<String>,
    pub error: Option<String>,
}

impl ServerHandle {
    async fn start(config: McpServerConfig) -> Result<Self, ToolPoolError> {
        let transport: Box<dyn McpTransport> = match config.transport {
            McpTransportKind::Stdio => {
                let t = StdioTransport::spawn(&config).map_err(ToolPoolError::Transport)?;
                Box::new(t)
            }
            McpTransportKind::Sse => {
                tracing::warn!(
                    server_id = %config.id,
                    "SSE transport is not yet implemented, server will be non-functional"
                );
                Box::new(SseTransport)
            }
        };

        let logs = SyncMutex::new(Vec::new());
        let last_error = SyncMutex::new(None);

        let init_params = protocol::initialize_params();
        let params_value = serde_json::to_value(&init_params)
            .map_err(|e| ToolPoolError::Protocol(format!("failed to serialize initialize params: {e}")))?;

        let resp = transport
            .send_request("initialize", Some(params_value))
            .await
            .map_err(ToolPoolError::Transport)?;

        if resp.is_error() {
            let err = resp.error.unwrap();
            return Err(ToolPoolError::Protocol(format!("initialize failed: {err}")));
        }
        logs.lock().push(format!("server {} initialized", config.id));

        transport
            .send_notification("notifications/initialized")
            .await
            .map_err(ToolPoolError::Transport)?;

        let tools_resp = transport
            .send_request("tools/list", None)
            .await
            .map_err(ToolPoolError::Transport)?;

        let tools = if tools_resp.is_error() {
            let msg = "tools/list returned error, server will have no tools".to_string();
            tracing::warn!(server_id = %config.id, "{msg}");
            *last_error.lock() = Some(msg.clone());
            logs.lock().push(msg);
            Vec::new()
        } else {
            let result_value = tools_resp.result.unwrap_or(Value::Null);
            match serde_json::from_value::<ToolsListResult>(result_value) {
                Ok(r) => r.tools,
                Err(e) => {
                    let msg = format!("failed to parse tools/list result: {e}");
                    tracing::warn!(server_id = %config.id, "{msg}");
                    *last_error.lock() = Some(msg.clone());
                    logs.lock().push(msg);
                    Vec::new()
                }
            }
        };

        tracing::info!(server_id = %config.id, tool_count = tools.len(), "tool server started");

        Ok(Self {
            id: config.id.clone(),
            config,
            tools,
            transport,
            logs,
            last_error,
        })
    }

    fn is_alive(&self) -> bool {
        self.transport.is_alive()
    }

    pub fn get_state(&self) -> ServerState {
        ServerState {
            logs: self.logs.lock().clone(),
            error: self.last_error.lock().clone(),
        }
    }

    pub fn get_config(&self) -> &McpServerConfig {
        &self.config
    }

    pub fn list_tools(&self) -> &[McpToolDef] {
        &self.tools
    }

    async fn invoke(&self, method_name: &str, arguments: Value) -> Result<ToolCallResult, ToolPoolError> {
        if !self.is_alive() {
            let msg = "transport is no longer alive".to_string();
            *self.last_error.lock() = Some(msg);
            return Err(ToolPoolError::ServerDown(self.id.clone()));
        }

        let params = serde_json::json!({ "name": method_name, "arguments": arguments });

        let resp = self
            .transport
            .send_request("tools/call", Some(params))
            .await
            .map_err(ToolPoolError::Transport)?;

        if resp.is_error() {
            let err = resp.error.unwrap();
            let msg = format!("tools/call failed: {err}");
            *self.last_error.lock() = Some(msg.clone());
            return Err(ToolPoolError::Protocol(msg));
        }

        let result_value = resp.result.unwrap_or(Value::Null);
        serde_json::from_value::<ToolCallResult>(result_value)
            .map_err(|e| ToolPoolError::Protocol(format!("failed to parse tools/call result: {e}")))
    }

    async fn shutdown(&self) {
        tracing::info!(server_id = %self.id, "shutting down tool server");
        self.transport.shutdown().await;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ToolSummary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One entry of `listAllTools()`: union of tools across servers.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub server: String,
    pub name: String,
    pub description: String,
    pub schema: Value,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ToolServerPool
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-workspace pool of running tool servers. 1:1 with a workspace.
pub struct ToolServerPool {
    workspace_id: String,
    servers: Mutex<HashMap<String, Arc<ServerHandle>>>,
}

impl ToolServerPool {
    /// An empty pool with no running servers.
    pub fn empty(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            servers: Mutex::new(HashMap::new()),
        }
    }

    /// Build a pool and start every non-disabled server in `set`.
    ///
    /// Per-server startup failures are logged and skipped — the pool is
    /// still returned, matching `ServiceRegistry.getToolPool`'s contract
    /// that tool-server startup failures do not abort pool creation.
    pub async fn from_config_set(workspace_id: impl Into<String>, set: &ToolConfigSet) -> Self {
        let pool = Self::empty(workspace_id);
        for (server_id, config) in set.non_disabled() {
            if let Err(e) = pool.start_server(server_id, config.clone()).await {
                tracing::warn!(
                    workspace_id = %pool.workspace_id,
                    server_id = %server_id,
                    error = %e,
                    "failed to start tool server, skipping"
                );
            }
        }
        pool
    }

    /// Idempotent: starting an already-running server is a no-op if the
    /// config matches, otherwise the old server is stopped first.
    pub async fn start_server(&self, server_id: &str, config: McpServerConfig) -> Result<(), ToolPoolError> {
        let mut servers = self.servers.lock().await;

        if let Some(existing) = servers.get(server_id) {
            if existing.get_config().matches(&config) {
                return Ok(());
            }
            existing.shutdown().await;
        }

        tracing::info!(
            workspace_id = %self.workspace_id,
            server_id = %server_id,
            command = %config.command,
            "starting tool server"
        );

        let handle = ServerHandle::start(config).await?;
        servers.insert(server_id.to_string(), Arc::new(handle));
        Ok(())
    }

    pub async fn stop_server(&self, server_id: &str) -> Result<(), ToolPoolError> {
        let mut servers = self.servers.lock().await;
        if let Some(handle) = servers.remove(server_id) {
            handle.shutdown().await;
        }
        Ok(())
    }

    /// Stop every server and release them. Safe to call more than once.
    pub async fn cleanup(&self) {
        let mut servers = self.servers.lock().await;
        let handles: Vec<Arc<ServerHandle>> = servers.values().cloned().collect();
        futures_util::future::join_all(handles.iter().map(|h| h.shutdown())).await;
        servers.clear();
    }

    pub async fn get_server(&self, server_id: &str) -> Option<Arc<ServerHandle>> {
        self.servers.lock().await.get(server_id).cloned()
    }

    pub async fn get_server_status(&self, server_id: &str) -> Option<ServerState> {
        self.servers.lock().await.get(server_id).map(|h| h.get_state())
    }

    /// Union of tools across every alive server.
    pub async fn list_all_tools(&self) -> Vec<ToolSummary> {
        self.servers
            .lock()
            .await
            .values()
            .filter(|h| h.is_alive())
            .flat_map(|h| {
                h.list_tools().iter().map(move |t| ToolSummary {
                    server: h.id.clone(),
                    name: t.name.clone(),
                    description: t.description.clone(),
                    schema: t.input_schema.clone(),
                })
            })
            .collect()
    }

    pub async fn invoke_tool(
        &self,
        server_id: &str,
        method_name: &str,
        args: Value,
    ) -> Result<ToolCallResult, ToolPoolError> {
        let handle = self
            .get_server(server_id)
            .await
            .ok_or_else(|| ToolPoolError::ServerNotFound(server_id.to_string()))?;

        handle.invoke(method_name, args).await
    }

    pub async fn server_count(&self) -> usize {
        self.servers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.servers.lock().await.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Errors specific to tool-server pool operations.
#[derive(Debug, thiserror::Error)]
pub enum ToolPoolError {
    #[error("tool transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("tool protocol error: {0}")]
    Protocol(String),

    #[error("tool server not found: {0}")]
    ServerNotFound(String),

    #[error("tool server is down: {0}")]
    ServerDown(String),
}

impl From<ToolPoolError> for sa_domain::error::Error {
    fn from(e: ToolPoolError) -> Self {
        match &e {
            ToolPoolError::ServerNotFound(_) => sa_domain::error::Error::NotFound(e.to_string()),
            ToolPoolError::ServerDown(_) | ToolPoolError::Transport(_) => {
                sa_domain::error::Error::ServiceUnavailable(e.to_string())
            }
            ToolPoolError::Protocol(_) => sa_domain::error::Error::Other(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_pool_has_no_servers() {
        let pool = ToolServerPool::empty("ws-1");
        assert!(pool.is_empty().await);
        assert_eq!(pool.server_count().await, 0);
        assert!(pool.list_all_tools().await.is_empty());
    }

    #[tokio::test]
    async fn stop_unknown_server_is_a_no_op() {
        let pool = ToolServerPool::empty("ws-1");
        assert!(pool.stop_server("nonexistent").await.is_ok());
    }

    #[tokio::test]
    async fn invoke_on_unknown_server_returns_not_found() {
        let pool = ToolServerPool::empty("ws-1");
        let err = pool
            .invoke_tool("nonexistent", "m", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolPoolError::ServerNotFound(_)));
    }
}
