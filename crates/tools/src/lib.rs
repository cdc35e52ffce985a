//! `sa-tools` — the workspace's `ToolServerPool` (C3).
//!
//! This crate provides:
//! - JSON-RPC 2.0 protocol types for communicating with tool servers.
//! - A stdio transport that spawns child processes and communicates over stdin/stdout.
//! - A `ToolServerPool` that starts/stops tool-server processes from a
//!   `ToolConfigSet` and orchestrates tool discovery and dispatch.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sa_tools::{ToolConfigSet, ToolServerPool};
//!
//! let set: ToolConfigSet = /* from the workspace's tools/config-sets.json */;
//! let pool = ToolServerPool::from_config_set("ws-1", &set).await;
//!
//! for tool in pool.list_all_tools().await {
//!     println!("{}:{}", tool.server, tool.name);
//! }
//!
//! let result = pool.invoke_tool("filesystem", "read_file", json!({"path": "/tmp/test.txt"})).await?;
//! ```

pub mod config;
pub mod manager;
pub mod protocol;
pub mod transport;

// Re-exports for convenience.
pub use config::{McpConfig, McpServerConfig, McpTransportKind, ToolConfigSet};
pub use manager::{ServerHandle, ServerState, ToolPoolError, ToolServerPool, ToolSummary};
pub use protocol::McpToolDef;
