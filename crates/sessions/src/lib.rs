//! `sa-sessions` — the Session/Round/Turn data model and its
//! on-disk stores.
//!
//! A workspace's [`SessionStore`] holds each session's metadata and its
//! ordered Round list; a sibling [`TurnStore`] holds the per-session Turn
//! stream, since Turns churn on every streamed delta and are kept in a
//! separate file to avoid rewriting round history on every token.

pub mod session;
pub mod store;
pub mod turn;
pub mod turn_store;

pub use session::{Request, Response, Round, Session};
pub use store::SessionStore;
pub use turn::{StreamingStatus, Turn, TurnStatus, ToolCall, ToolCallRecord};
pub use turn_store::TurnStore;
