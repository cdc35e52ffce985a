use std::path::PathBuf;

use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;

use sa_domain::error::Error;
use sa_workspace::WorkspaceSummary;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceBody {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct AdoptWorkspaceBody {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub description: Option<String>,
}

async fn find_summary(state: &AppState, workspace_id: &str) -> ApiResult<WorkspaceSummary> {
    let root = state.registry.get_root().await.map_err(ApiError)?;
    root.list_workspaces()
        .into_iter()
        .find(|w| w.id == workspace_id)
        .ok_or_else(|| ApiError(Error::NotFound(format!("workspace '{workspace_id}' not found"))))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<WorkspaceSummary>>> {
    let root = state.registry.get_root().await.map_err(ApiError)?;
    Ok(Json(root.list_workspaces()))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateWorkspaceBody>,
) -> ApiResult<Json<WorkspaceSummary>> {
    let root = state.registry.get_root().await.map_err(ApiError)?;
    let workspace = root
        .create_workspace(&body.name, body.description, body.path)
        .map_err(ApiError)?;
    find_summary(&state, &workspace.id).await.map(Json)
}

pub async fn adopt(
    State(state): State<AppState>,
    Json(body): Json<AdoptWorkspaceBody>,
) -> ApiResult<Json<WorkspaceSummary>> {
    let root = state.registry.get_root().await.map_err(ApiError)?;
    let workspace = root
        .adopt_workspace(&body.name, body.path, body.description)
        .map_err(ApiError)?;
    find_summary(&state, &workspace.id).await.map(Json)
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let summary = find_summary(&state, &workspace_id).await?;
    let workspace = state
        .registry
        .get_workspace(&workspace_id, None)
        .await
        .map_err(ApiError)?;
    Ok(Json(json!({
        "summary": summary,
        "config": workspace.get_config(),
    })))
}

pub async fn delete(State(state): State<AppState>, Path(workspace_id): Path<String>) -> ApiResult<()> {
    let summary = find_summary(&state, &workspace_id).await?;
    state.registry.release_workspace(&workspace_id).await;
    let root = state.registry.get_root().await.map_err(ApiError)?;
    root.delete_workspace(&summary.name).map_err(ApiError)?;
    Ok(())
}
