use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use sa_domain::error::Error;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub async fn list(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    Ok(Json(workspace.files.list_names()))
}

#[derive(Debug, Serialize)]
pub struct FileBody {
    pub content: String,
}

pub async fn read(
    State(state): State<AppState>,
    Path((workspace_id, name)): Path<(String, String)>,
) -> ApiResult<Json<FileBody>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    workspace
        .files
        .read_file(&name)
        .map(|content| Json(FileBody { content }))
        .ok_or_else(|| ApiError(Error::NotFound(format!("file '{name}' not found"))))
}

#[derive(Debug, Deserialize)]
pub struct WriteFileBody {
    pub content: String,
}

pub async fn write(
    State(state): State<AppState>,
    Path((workspace_id, name)): Path<(String, String)>,
    Json(body): Json<WriteFileBody>,
) -> ApiResult<()> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    workspace.files.write_file(&name, &body.content).map_err(ApiError)?;
    Ok(())
}

pub async fn remove(
    State(state): State<AppState>,
    Path((workspace_id, name)): Path<(String, String)>,
) -> ApiResult<()> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    workspace.files.delete_file(&name).map_err(ApiError)?;
    Ok(())
}
