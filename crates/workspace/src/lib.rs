//! `sa-workspace` — C1 `RootManager` and C2 `WorkspaceManager`: the
//! on-disk root registry and the per-workspace sub-managers (sessions,
//! prompt, tools, models, files, dynamic contexts) that sit underneath it.

pub mod dynamic;
pub mod files;
pub mod manager;
pub mod models;
pub mod prompt;
pub mod root;
pub mod tools_store;

pub use dynamic::{DynamicContext, DynamicContextStore, RefreshPolicy};
pub use files::{FileHash, FilesStore};
pub use manager::{WorkspaceConfig, WorkspaceConfigPatch, WorkspaceManager};
pub use models::{ModelsConfig, ModelsStore};
pub use prompt::{PromptPatch, PromptStore};
pub use root::{RootManager, WorkspaceEntry, WorkspaceSummary};
pub use tools_store::ToolConfigStore;
