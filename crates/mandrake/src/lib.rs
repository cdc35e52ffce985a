//! `mandrake` — the HTTP process that hosts C7 InitService and wires the
//! rest of the workspace's crates (`sa-registry`, `sa-coordinator`,
//! `sa-streaming`, ...) onto an axum router.

pub mod api;
pub mod cors;
pub mod error;
pub mod init;
pub mod state;

pub use state::AppState;
