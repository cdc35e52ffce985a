use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Json;
use axum::response::Sse;
use serde::Deserialize;

use sa_coordinator::CoordinatorEvent;
use sa_domain::error::Error;
use sa_sessions::{Session, Turn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub async fn list(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
) -> ApiResult<Json<Vec<Session>>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    Ok(Json(workspace.sessions.list()))
}

#[derive(Debug, Deserialize, Default)]
pub struct CreateSessionBody {
    #[serde(default)]
    pub title: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    Json(body): Json<CreateSessionBody>,
) -> ApiResult<Json<Session>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    let session_id = uuid::Uuid::new_v4().to_string();
    let session = workspace.sessions.create(&session_id, &workspace_id).map_err(ApiError)?;
    let session = match body.title {
        Some(title) => workspace
            .sessions
            .update_metadata(&session_id, Some(title), None, None)
            .map_err(ApiError)?,
        None => session,
    };
    Ok(Json(session))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path((workspace_id, session_id)): Path<(String, String)>,
) -> ApiResult<Json<Session>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    workspace
        .sessions
        .get(&session_id)
        .map(Json)
        .ok_or_else(|| ApiError(Error::NotFound(format!("session '{session_id}' not found"))))
}

/// Releases the cached coordinator (if any) before deleting the session's
/// persisted record, so a session that's mid-turn can't be deleted out
/// from under its coordinator.
pub async fn release(
    State(state): State<AppState>,
    Path((workspace_id, session_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    state.registry.release_session(&workspace_id, &session_id).await;
    workspace.sessions.delete(&session_id).map_err(ApiError)?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct PostMessageBody {
    pub content: String,
}

/// Runs one `handleRequest` turn to completion and returns the rendered
/// history for the response it produced. Subscribes to the coordinator's
/// event stream *before* spawning the request so the `Started` event
/// naming the new `response_id` can't race past us.
pub async fn post_message(
    State(state): State<AppState>,
    Path((workspace_id, session_id)): Path<(String, String)>,
    Json(body): Json<PostMessageBody>,
) -> ApiResult<Json<Vec<Turn>>> {
    let workspace = state.registry.get_workspace(&workspace_id, None).await.map_err(ApiError)?;
    let coordinator = state
        .registry
        .get_session_coordinator(&workspace_id, None, &session_id)
        .await
        .map_err(ApiError)?;

    let mut events = coordinator.subscribe();
    let request_coordinator = Arc::clone(&coordinator);
    let content = body.content;
    let handle = tokio::spawn(async move { request_coordinator.handle_request(&content).await });

    let response_id = loop {
        match events.recv().await {
            Ok(CoordinatorEvent::Started { response_id }) => break response_id,
            Ok(_) => continue,
            Err(_) => {
                return Err(ApiError(Error::Other(
                    "coordinator's event channel closed before the turn started".into(),
                )))
            }
        }
    };

    handle
        .await
        .map_err(|e| ApiError(Error::Other(format!("turn task panicked: {e}"))))?
        .map_err(ApiError)?;

    let turns = workspace.turns.for_response(&session_id, &response_id).map_err(ApiError)?;
    Ok(Json(turns))
}

/// Streams the turn produced by one `handleRequest` call as SSE. The
/// subscriber's `CancelToken` is discarded — ending the HTTP
/// connection drops the response stream, which is all a disconnect needs
/// to do; the coordinator's own in-flight turn runs independently of it.
pub async fn post_stream(
    State(state): State<AppState>,
    Path((workspace_id, session_id)): Path<(String, String)>,
    Json(body): Json<PostMessageBody>,
) -> ApiResult<Sse<impl futures_core::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>>> {
    let coordinator = state
        .registry
        .get_session_coordinator(&workspace_id, None, &session_id)
        .await
        .map_err(ApiError)?;

    let (stream, _cancel) = sa_streaming::subscribe(Arc::clone(&coordinator));

    let content = body.content;
    tokio::spawn(async move {
        if let Err(err) = coordinator.handle_request(&content).await {
            tracing::warn!(error = %err, "handle_request failed for streamed turn");
        }
    });

    Ok(sa_streaming::into_sse_response(stream))
}
