//! `sa-streaming` — `StreamingBridge` (C6): translates a coordinator's
//! internal turn notifier into a finite, ordered, typed event sequence for
//! one consumer, and frames it as SSE.

use std::sync::Arc;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_core::Stream;
use serde::Serialize;

use sa_coordinator::{CancelToken, CoordinatorEvent, SessionCoordinator};
use sa_domain::stream::BoxStream;
use sa_sessions::Turn;

/// Wire event schema: one per SSE `data:` frame, tagged by `type` so JSON
/// alone carries what would otherwise be an SSE `event:` line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum WireEvent {
    #[serde(rename = "start")]
    Start { response_id: String },
    #[serde(rename = "update")]
    Update { turn: Turn },
    #[serde(rename = "complete")]
    Complete { response_id: String },
    #[serde(rename = "error")]
    Error { error: String },
}

/// Registers a consumer with `coordinator`'s turn notifier and returns a
/// cold stream of `WireEvent`s plus a handle that, when cancelled, stops
/// the stream without affecting the coordinator's in-flight work.
///
/// Only events belonging to the response started by the *first* `Started`
/// observed on this subscription are forwarded — a subscriber that
/// attaches mid-response silently waits for the next one, matching a
/// fresh per-consumer callback registration rather than a replay log.
pub fn subscribe(coordinator: Arc<SessionCoordinator>) -> (BoxStream<'static, WireEvent>, CancelToken) {
    let cancel = CancelToken::new();
    let cancel_for_stream = cancel.clone();
    let mut rx = coordinator.subscribe();

    let stream = async_stream::stream! {
        let mut response_id: Option<String> = None;
        loop {
            tokio::select! {
                _ = cancel_for_stream.cancelled() => break,
                recv = rx.recv() => {
                    match recv {
                        Ok(CoordinatorEvent::Started { response_id: rid }) => {
                            response_id = Some(rid.clone());
                            yield WireEvent::Start { response_id: rid };
                        }
                        Ok(CoordinatorEvent::TurnUpdated { response_id: rid, turn }) => {
                            if response_id.as_deref() == Some(rid.as_str()) {
                                yield WireEvent::Update { turn };
                            }
                        }
                        Ok(CoordinatorEvent::Completed { response_id: rid }) => {
                            if response_id.as_deref() == Some(rid.as_str()) {
                                yield WireEvent::Complete { response_id: rid };
                                break;
                            }
                        }
                        Ok(CoordinatorEvent::Failed { response_id: rid, error }) => {
                            if response_id.as_deref() == Some(rid.as_str()) {
                                yield WireEvent::Error { error };
                                break;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "streaming bridge subscriber lagged, resyncing from store");
                            if let Some(rid) = response_id.clone() {
                                match coordinator.turns_for_response(&rid) {
                                    Ok(turns) => {
                                        for turn in turns {
                                            yield WireEvent::Update { turn };
                                        }
                                    }
                                    Err(e) => {
                                        tracing::warn!(error = %e, "failed to resync turns after lag");
                                    }
                                }
                            }
                            continue;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    };

    (Box::pin(stream), cancel)
}

/// Frames a `WireEvent` stream as the `Content-Type: text/event-stream`
/// response the HTTP surface serves. Frames carry only `data: <json>\n\n`
/// — the event's `type` tag lives in the JSON, not an SSE `event:` line.
pub fn into_sse_response(
    stream: BoxStream<'static, WireEvent>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let frames = futures_util::StreamExt::map(stream, |event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(Event::default().data(data))
    });
    Sse::new(frames).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use sa_domain::config::LlmConfig;
    use sa_providers::ProviderRegistry;
    use sa_sessions::{SessionStore, TurnStore};
    use sa_tools::ToolServerPool;
    use sa_workspace::{DynamicContextStore, FilesStore, ModelsStore, PromptStore};

    fn coordinator(dir: &std::path::Path) -> Arc<SessionCoordinator> {
        let sessions = Arc::new(SessionStore::new(dir).unwrap());
        let turns = Arc::new(TurnStore::new(&sessions.turns_dir()).unwrap());
        let prompt = Arc::new(PromptStore::load(dir).unwrap());
        let models = Arc::new(ModelsStore::load(dir).unwrap());
        let files = Arc::new(FilesStore::load(dir).unwrap());
        let dynamic = Arc::new(DynamicContextStore::load(dir).unwrap());
        let tools = Arc::new(ToolServerPool::empty("ws1"));
        let providers = Arc::new(ProviderRegistry::from_config(&LlmConfig::default()).unwrap());
        let session = sessions.create("sess-1", "ws1").unwrap();

        Arc::new(SessionCoordinator::new(sa_coordinator::SessionCoordinatorDeps {
            workspace_id: "ws1".into(),
            workspace_name: "demo".into(),
            workspace_path: dir.display().to_string(),
            workspace_description: None,
            session_id: session.id,
            sessions,
            turns,
            prompt,
            tools,
            models,
            files,
            dynamic,
            providers,
            context_builder: sa_contextpack::ContextPackBuilder::new(20_000, 24_000),
        }))
    }

    #[tokio::test]
    async fn forwards_start_then_error_for_a_failing_request() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path());
        let (mut stream, _cancel) = subscribe(Arc::clone(&coordinator));

        // No LLM provider is configured, so `handle_request` will fail
        // after emitting Started and Failed — enough to exercise the
        // bridge's full start -> error translation and its termination.
        let handle = tokio::spawn(async move {
            let _ = coordinator.handle_request("hello").await;
        });

        let first = stream.next().await.expect("expected a start event");
        assert!(matches!(first, WireEvent::Start { .. }));

        let second = stream.next().await.expect("expected an error event");
        assert!(matches!(second, WireEvent::Error { .. }));

        assert!(stream.next().await.is_none());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancel_ends_the_stream_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path());
        let (mut stream, cancel) = subscribe(coordinator);
        cancel.cancel();
        assert!(stream.next().await.is_none());
    }
}
