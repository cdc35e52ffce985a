//! `sa-contextpack` — deterministic assembly of a session's system prompt.
//!
//! `ContextPackBuilder::build_context` implements the prompt half of
//! `SessionCoordinator::buildContext`: workspace metadata, system info,
//! date/time, the tool-use protocol description drawn from a
//! `ToolServerPool`, active workspace files (truncated per-file and by a
//! total character budget), and dynamic-context method outputs. Rendering
//! session history into `{role, content}` pairs is left to the coordinator,
//! which owns the Round/Turn records this crate has no dependency on.

pub mod builder;
pub mod injection;
pub mod report;
pub mod truncation;

pub use builder::{ContextPackBuilder, DynamicContextOutput, PromptConfig, WorkspaceFile, WorkspaceMetadata};
pub use report::{ContextReport, DynamicContextReport, FileReport};
