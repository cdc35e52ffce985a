use serde::Serialize;

/// Structured trace events emitted across the mandrake workspace.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    /// A `buildContext` call assembled a system prompt.
    ContextBuilt {
        total_injected_chars: usize,
        files_included: usize,
        files_truncated_per_file: usize,
        files_truncated_total_cap: usize,
        files_excluded: usize,
        tool_count: usize,
        dynamic_context_count: usize,
    },
    /// A workspace file was read for context injection.
    WorkspaceFileRead {
        filename: String,
        raw_chars: usize,
        cache_hit: bool,
    },
    LlmRequest {
        provider: String,
        model: String,
        role: String,
        streaming: bool,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    LlmFallback {
        from_provider: String,
        from_model: String,
        to_provider: String,
        to_model: String,
        reason: String,
    },
    /// `ServiceRegistry` constructed a new cached manager instance.
    ResourceResolved {
        kind: String,
        key: String,
        is_new: bool,
    },
    /// `ServiceRegistry` evicted a cached manager instance.
    ResourceReleased {
        kind: String,
        key: String,
        reason: String,
    },
    /// A `Turn` transitioned status; emitted once per persisted write so
    /// the event log mirrors what subscribers of `StreamingBridge` saw.
    TurnStateChanged {
        session_id: String,
        response_id: String,
        turn_index: u32,
        status: String,
    },
    /// A tool invocation made during the model loop.
    ToolInvoked {
        workspace_id: String,
        server_name: String,
        method_name: String,
        ok: bool,
        duration_ms: u64,
    },
    /// A second `handleRequest` was rejected because one was already
    /// in flight for the session.
    SessionBusyRejected { session_id: String },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sa_event");
    }
}
