use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use sa_domain::config::ToolConfigSet;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ToolSetsResponse {
    pub sets: Vec<String>,
    pub active: String,
}

pub async fn list_sets(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
) -> ApiResult<Json<ToolSetsResponse>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    Ok(Json(ToolSetsResponse {
        sets: workspace.tools.list_sets(),
        active: workspace.tools.active_name(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateSetBody {
    pub name: String,
    #[serde(default)]
    pub set: ToolConfigSet,
}

pub async fn create_set(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    Json(body): Json<CreateSetBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    workspace.tools.create_set(&body.name, body.set).map_err(ApiError)?;
    Ok(Json(json!({ "created": body.name })))
}

#[derive(Debug, Deserialize)]
pub struct SetActiveBody {
    pub name: String,
}

/// Setting the active tool set invalidates the workspace's cached
/// `ToolServerPool` — the pool is rebuilt from the new active set on the
/// next `getToolPool` call.
pub async fn set_active(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    Json(body): Json<SetActiveBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    workspace.tools.set_active(&body.name).map_err(ApiError)?;
    state.registry.release_tool_pool(&workspace_id).await;
    Ok(Json(json!({ "active": body.name })))
}

pub async fn delete_set(
    State(state): State<AppState>,
    Path((workspace_id, name)): Path<(String, String)>,
) -> ApiResult<()> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    workspace.tools.delete_set(&name).map_err(ApiError)?;
    Ok(())
}
