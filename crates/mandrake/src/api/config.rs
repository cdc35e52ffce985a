use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;

use sa_workspace::{PromptPatch, WorkspaceConfig, WorkspaceConfigPatch};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct UpdateConfigBody {
    #[serde(default)]
    pub prompt: Option<PromptPatch>,
    /// `roleName -> "provider_id/model_name"` pairs to merge into
    /// `models.json`.
    #[serde(default)]
    pub model_roles: Vec<(String, String)>,
}

pub async fn get_config(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
) -> ApiResult<Json<WorkspaceConfig>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    Ok(Json(workspace.get_config()))
}

pub async fn update_config(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    Json(body): Json<UpdateConfigBody>,
) -> ApiResult<Json<WorkspaceConfig>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    let config = workspace
        .update_config(WorkspaceConfigPatch {
            prompt: body.prompt,
            model_roles: body.model_roles,
        })
        .map_err(ApiError)?;
    Ok(Json(config))
}
