//! `sa-coordinator` — `SessionCoordinator` (C4): `handleRequest`,
//! `buildContext`, `cleanup`, and the model/tool turn loop.

pub mod cancel;
pub mod context;
pub mod events;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{broadcast, Mutex as AsyncMutex};

use sa_contextpack::ContextPackBuilder;
use sa_domain::error::{Error, Result};
use sa_domain::stream::StreamEvent;
use sa_domain::tool::{Message, ToolDefinition};
use sa_providers::{ChatRequest, ProviderRegistry};
use sa_sessions::{SessionStore, Turn, TurnStore};
use sa_tools::ToolServerPool;
use sa_workspace::{DynamicContextStore, FilesStore, ModelsStore, PromptStore};

pub use cancel::CancelToken;
pub use events::{CoordinatorEvent, EVENT_CHANNEL_CAPACITY};

use context::ContextDeps;

const DELTA_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(120);
const RETRY_BACKOFF_MS: [u64; 1] = [100];

/// Identity and dependency bundle a `ServiceRegistry` injects when
/// constructing a coordinator.
pub struct SessionCoordinatorDeps {
    pub workspace_id: String,
    pub workspace_name: String,
    pub workspace_path: String,
    pub workspace_description: Option<String>,
    pub session_id: String,
    pub sessions: Arc<SessionStore>,
    pub turns: Arc<TurnStore>,
    pub prompt: Arc<PromptStore>,
    pub tools: Arc<ToolServerPool>,
    pub models: Arc<ModelsStore>,
    pub files: Arc<FilesStore>,
    pub dynamic: Arc<DynamicContextStore>,
    pub providers: Arc<ProviderRegistry>,
    pub context_builder: ContextPackBuilder,
}

/// One session's model/tool-call loop driver. Bound to exactly one
/// in-flight `handleRequest` at a time.
pub struct SessionCoordinator {
    workspace_id: String,
    session_id: String,
    sessions: Arc<SessionStore>,
    turns: Arc<TurnStore>,
    tools: Arc<ToolServerPool>,
    models: Arc<ModelsStore>,
    providers: Arc<ProviderRegistry>,
    context: ContextDeps,

    busy: AsyncMutex<()>,
    current_cancel: SyncMutex<Option<CancelToken>>,
    events: broadcast::Sender<CoordinatorEvent>,
}

impl SessionCoordinator {
    pub fn new(deps: SessionCoordinatorDeps) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let tools = deps.tools;
        let tools_for_context = Arc::clone(&tools);
        let turns = deps.turns;
        let turns_for_context = Arc::clone(&turns);
        Self {
            workspace_id: deps.workspace_id.clone(),
            session_id: deps.session_id,
            sessions: deps.sessions,
            turns,
            tools,
            models: deps.models,
            providers: deps.providers,
            context: ContextDeps {
                workspace_id: deps.workspace_id,
                workspace_name: deps.workspace_name,
                workspace_path: deps.workspace_path,
                workspace_description: deps.workspace_description,
                prompt: deps.prompt,
                tools: tools_for_context,
                files: deps.files,
                dynamic: deps.dynamic,
                turns: turns_for_context,
                builder: deps.context_builder,
            },
            busy: AsyncMutex::new(()),
            current_cancel: SyncMutex::new(None),
            events,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether a `handleRequest` is currently in flight. Used by the
    /// registry's idle sweep to avoid evicting a session mid-request.
    pub fn is_busy(&self) -> bool {
        self.busy.try_lock().is_err()
    }

    /// Registers a new consumer with the coordinator's turn notifier. Used
    /// by `StreamingBridge::subscribe`.
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    /// Re-reads the persisted Turn records for `response_id`. Used by
    /// `StreamingBridge` to recover a subscriber's dropped state after a
    /// broadcast-channel lag instead of leaving a stale Turn unreported.
    pub fn turns_for_response(&self, response_id: &str) -> Result<Vec<Turn>> {
        self.turns.for_response(&self.session_id, response_id)
    }

    /// Cancels the in-flight `handleRequest`, if any. Idempotent.
    pub fn cancel_current(&self) {
        if let Some(token) = self.current_cancel.lock().clone() {
            token.cancel();
        }
    }

    /// `buildContext(sessionId)` — assembles the system prompt and rendered
    /// history for the next model call.
    pub async fn build_context(&self) -> Result<context::BuiltContext> {
        let session = self
            .sessions
            .get(&self.session_id)
            .ok_or_else(|| Error::NotFound(format!("session '{}' not found", self.session_id)))?;
        self.context.build(&session).await
    }

    /// `handleRequest(sessionId, userContent)` — runs to completion
    /// (blocking return), streaming Turn updates over `subscribe()` as it
    /// goes. Fails fast with `Error::Busy` if already in flight.
    pub async fn handle_request(&self, user_content: &str) -> Result<()> {
        let _guard = self
            .busy
            .try_lock()
            .map_err(|_| {
                sa_domain::trace::TraceEvent::SessionBusyRejected {
                    session_id: self.session_id.clone(),
                }
                .emit();
                Error::Busy(format!("session '{}' is already processing a request", self.session_id))
            })?;

        let cancel = CancelToken::new();
        *self.current_cancel.lock() = Some(cancel.clone());

        let result = self.run_request(user_content, &cancel).await;

        *self.current_cancel.lock() = None;
        result
    }

    async fn run_request(&self, user_content: &str, cancel: &CancelToken) -> Result<()> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let response_id = uuid::Uuid::new_v4().to_string();

        self.sessions
            .append_round(&self.session_id, &request_id, &response_id, user_content)?;

        let _ = self.events.send(CoordinatorEvent::Started {
            response_id: response_id.clone(),
        });

        match self.run_model_loop(&response_id, cancel).await {
            Ok(()) => {
                let _ = self.events.send(CoordinatorEvent::Completed {
                    response_id: response_id.clone(),
                });
                Ok(())
            }
            Err(e) => {
                let _ = self.events.send(CoordinatorEvent::Failed {
                    response_id: response_id.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Step 3 of `handleRequest`: the model/tool-call loop for one response.
    async fn run_model_loop(&self, response_id: &str, cancel: &CancelToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                self.fail_current_turn(response_id, "cancelled")?;
                return Err(Error::Other("cancelled".into()));
            }

            let built = self.build_context().await?;
            let turn_index = self.turns.next_turn_index(&self.session_id, response_id)?;
            let mut turn = Turn::new(response_id, turn_index);

            match self
                .run_turn_with_retry(&mut turn, &built.system_prompt, &built.history, cancel)
                .await
            {
                Ok(TurnOutcome::ToolCall { server_name, method_name, arguments }) => {
                    turn.tool_calls.call = Some(sa_sessions::turn::ToolCall {
                        server_name: server_name.clone(),
                        method_name: method_name.clone(),
                        arguments: arguments.clone(),
                    });
                    turn.complete();
                    self.persist_turn(response_id, turn.clone())?;

                    let started = std::time::Instant::now();
                    let invoke_result = self
                        .tools
                        .invoke_tool(&server_name, &method_name, arguments.clone())
                        .await;
                    let ok = invoke_result.is_ok();
                    sa_domain::trace::TraceEvent::ToolInvoked {
                        workspace_id: self.workspace_id.clone(),
                        server_name: server_name.clone(),
                        method_name: method_name.clone(),
                        ok,
                        duration_ms: started.elapsed().as_millis() as u64,
                    }
                    .emit();

                    let response_value = match invoke_result {
                        Ok(result) => {
                            serde_json::to_value(&result.content).unwrap_or(serde_json::Value::Null)
                        }
                        Err(e) => serde_json::json!({ "error": e.to_string() }),
                    };
                    turn.tool_calls.response = Some(response_value);
                    self.persist_turn(response_id, turn.clone())?;
                }
                Ok(TurnOutcome::EndOfStream) => {
                    turn.complete();
                    self.persist_turn(response_id, turn)?;
                    return Ok(());
                }
                Err(e) => {
                    turn.fail(e.to_string());
                    self.persist_turn(response_id, turn)?;
                    return Err(e);
                }
            }
        }
    }

    fn fail_current_turn(&self, response_id: &str, message: &str) -> Result<()> {
        let turns = self.turns.for_response(&self.session_id, response_id)?;
        if let Some(mut turn) = turns.into_iter().last() {
            if !turn.is_terminal() {
                turn.fail(message);
                self.persist_turn(response_id, turn)?;
            }
        }
        Ok(())
    }

    fn persist_turn(&self, response_id: &str, turn: Turn) -> Result<()> {
        sa_domain::trace::TraceEvent::TurnStateChanged {
            session_id: self.session_id.clone(),
            response_id: response_id.to_string(),
            turn_index: turn.index,
            status: format!("{:?}", turn.status),
        }
        .emit();
        self.turns.upsert(&self.session_id, turn.clone())?;
        let _ = self.events.send(CoordinatorEvent::TurnUpdated {
            response_id: response_id.to_string(),
            turn,
        });
        Ok(())
    }

    /// Runs one Turn's model stream, retrying once with backoff on a
    /// transient transport error.
    async fn run_turn_with_retry(
        &self,
        turn: &mut Turn,
        system_prompt: &str,
        history: &[Message],
        cancel: &CancelToken,
    ) -> Result<TurnOutcome> {
        let mut attempt = 0;
        loop {
            match self.stream_turn_once(turn, system_prompt, history, cancel).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if attempt < RETRY_BACKOFF_MS.len() && is_retriable(&e) => {
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS[attempt])).await;
                    turn.raw_response.clear();
                    turn.content.clear();
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn stream_turn_once(
        &self,
        turn: &mut Turn,
        system_prompt: &str,
        history: &[Message],
        cancel: &CancelToken,
    ) -> Result<TurnOutcome> {
        let (provider, model) = self.resolve_model()?;

        let mut messages = vec![Message::system(system_prompt.to_string())];
        messages.extend(history.iter().cloned());

        let tool_summaries = self.tools.list_all_tools().await;
        let tools: Vec<ToolDefinition> = tool_summaries
            .iter()
            .map(|t| ToolDefinition {
                name: format!("{}.{}", t.server, t.name),
                description: t.description.clone(),
                parameters: t.schema.clone(),
            })
            .collect();

        let request = ChatRequest {
            messages,
            tools,
            model,
            ..Default::default()
        };

        let mut stream = provider.chat_stream(&request).await?;
        self.persist_turn(&turn.response_id, turn.clone())?;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Other("cancelled".into())),
                item = tokio::time::timeout(DELTA_INACTIVITY_TIMEOUT, stream.next()) => item,
            };
            let item = next.map_err(|_| Error::Timeout("model delta inactivity".into()))?;
            let Some(event) = item else {
                turn.complete();
                return Ok(TurnOutcome::EndOfStream);
            };
            match event? {
                StreamEvent::Token { text } | StreamEvent::Thinking { text } => {
                    turn.raw_response.push_str(&text);
                    turn.content.push_str(&text);
                    turn.current_tokens += 1;
                    self.persist_turn(&turn.response_id, turn.clone())?;
                }
                StreamEvent::ToolCallStarted { .. } | StreamEvent::ToolCallDelta { .. } => {}
                StreamEvent::ToolCallFinished { tool_name, arguments, .. } => {
                    let (server_name, method_name) = split_tool_name(&tool_name)?;
                    return Ok(TurnOutcome::ToolCall {
                        server_name,
                        method_name,
                        arguments,
                    });
                }
                StreamEvent::Done { usage, .. } => {
                    if let Some(usage) = usage {
                        turn.expected_tokens = Some(usage.total_tokens);
                    }
                    turn.complete();
                    return Ok(TurnOutcome::EndOfStream);
                }
                StreamEvent::Error { message } => return Err(Error::Provider {
                    provider: provider.provider_id().to_string(),
                    message,
                }),
            }
        }
    }

    fn resolve_model(&self) -> Result<(Arc<dyn sa_providers::LlmProvider>, Option<String>)> {
        const ROLE: &str = "executor";

        if let Some(spec) = self.models.model_for_role(ROLE) {
            let mut parts = spec.splitn(2, '/');
            let provider_id = parts.next().unwrap_or(&spec).to_string();
            let model_name = parts.next().map(|s| s.to_string());
            let provider = self.providers.get(&provider_id).ok_or_else(|| {
                Error::ServiceUnavailable(format!("provider '{provider_id}' not configured"))
            })?;
            return Ok((provider, model_name));
        }

        if let Some(provider) = self.providers.for_role(ROLE) {
            let model_name = self
                .providers
                .model_for_role(ROLE)
                .and_then(|s| s.split_once('/'))
                .map(|(_, m)| m.to_string());
            return Ok((provider, model_name));
        }

        Err(Error::ServiceUnavailable(
            "no LLM provider configured for role 'executor'".into(),
        ))
    }

    /// `cleanup()` — terminates in-flight streaming, releases coordinator-
    /// local resources. Idempotent.
    pub fn cleanup(&self) {
        self.cancel_current();
        self.turns.evict(&self.session_id);
    }
}

enum TurnOutcome {
    ToolCall {
        server_name: String,
        method_name: String,
        arguments: serde_json::Value,
    },
    EndOfStream,
}

fn split_tool_name(name: &str) -> Result<(String, String)> {
    name.split_once('.')
        .map(|(s, m)| (s.to_string(), m.to_string()))
        .ok_or_else(|| Error::ValidationError(format!("malformed tool name '{name}', expected 'server.method'")))
}

fn is_retriable(err: &Error) -> bool {
    match err {
        Error::Timeout(_) => true,
        Error::Http(_) => true,
        Error::Provider { message, .. } => {
            message.contains("HTTP 5")
                || message.contains("HTTP 502")
                || message.contains("HTTP 503")
                || message.contains("HTTP 504")
                || message.contains("HTTP 500")
                || message.contains("HTTP 529")
        }
        _ => false,
    }
}
