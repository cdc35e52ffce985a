use axum::extract::{Path, State};
use axum::response::Json;

use sa_domain::error::Error;
use sa_workspace::DynamicContext;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub async fn list(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
) -> ApiResult<Json<Vec<DynamicContext>>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    Ok(Json(workspace.dynamic.list()))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path((workspace_id, context_id)): Path<(String, String)>,
) -> ApiResult<Json<DynamicContext>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    workspace
        .dynamic
        .get(&context_id)
        .map(Json)
        .ok_or_else(|| ApiError(Error::NotFound(format!("dynamic context '{context_id}' not found"))))
}

pub async fn upsert(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    Json(context): Json<DynamicContext>,
) -> ApiResult<Json<DynamicContext>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    workspace.dynamic.upsert(context.clone()).map_err(ApiError)?;
    Ok(Json(context))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((workspace_id, context_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    workspace.dynamic.delete(&context_id).map_err(ApiError)?;
    Ok(())
}
