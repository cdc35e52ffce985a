pub mod config;
pub mod dynamic;
pub mod files;
pub mod sessions;
pub mod tools;
pub mod workspaces;

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::AppState;

/// Builds the full HTTP surface: CRUD on workspaces, sessions, prompt
/// config, models, tools, dynamic contexts, and files, plus the
/// blocking-message and SSE-stream session endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        // ── Workspaces (C1 RootManager) ─────────────────────────────
        .route("/workspaces", get(workspaces::list).post(workspaces::create))
        .route("/workspaces/adopt", post(workspaces::adopt))
        .route(
            "/workspaces/:workspace_id",
            get(workspaces::get_one).delete(workspaces::delete),
        )
        // ── Per-workspace config (C2 WorkspaceManager) ──────────────
        .route(
            "/workspaces/:workspace_id/config",
            get(config::get_config).patch(config::update_config),
        )
        // ── Tool config sets (C3 ToolServerPool coordination) ───────
        .route(
            "/workspaces/:workspace_id/tools/sets",
            get(tools::list_sets).post(tools::create_set),
        )
        .route("/workspaces/:workspace_id/tools/active", put(tools::set_active))
        .route("/workspaces/:workspace_id/tools/sets/:name", delete(tools::delete_set))
        // ── Dynamic contexts ─────────────────────────────────────────
        .route(
            "/workspaces/:workspace_id/dynamic-contexts",
            get(dynamic::list).post(dynamic::upsert),
        )
        .route(
            "/workspaces/:workspace_id/dynamic-contexts/:context_id",
            get(dynamic::get_one).delete(dynamic::delete),
        )
        // ── Files ────────────────────────────────────────────────────
        .route("/workspaces/:workspace_id/files", get(files::list))
        .route(
            "/workspaces/:workspace_id/files/:name",
            get(files::read).put(files::write).delete(files::remove),
        )
        // ── Sessions (§3 data model) ─────────────────────────────────
        .route(
            "/workspaces/:workspace_id/sessions",
            get(sessions::list).post(sessions::create),
        )
        .route(
            "/workspaces/:workspace_id/sessions/:session_id",
            get(sessions::get_one).delete(sessions::release),
        )
        .route(
            "/workspaces/:workspace_id/sessions/:session_id/messages",
            post(sessions::post_message),
        )
        .route(
            "/workspaces/:workspace_id/sessions/:session_id/stream",
            post(sessions::post_stream),
        )
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}
