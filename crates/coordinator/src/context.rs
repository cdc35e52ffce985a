//! `buildContext`: assembles the system prompt and rendered history that
//! `handleRequest` sends to the model provider on every turn.

use std::sync::Arc;

use chrono::Utc;

use sa_contextpack::{ContextPackBuilder, DynamicContextOutput, WorkspaceMetadata};
use sa_domain::error::Result;
use sa_domain::tool::Message;
use sa_sessions::{Session, TurnStore};
use sa_tools::ToolServerPool;
use sa_workspace::{DynamicContextStore, FilesStore, PromptStore};

/// Everything `buildContext` needs beyond the session's own identity,
/// injected by the `SessionCoordinator` rather than looked up through a
/// parent aggregate.
pub struct ContextDeps {
    pub workspace_id: String,
    pub workspace_name: String,
    pub workspace_path: String,
    pub workspace_description: Option<String>,
    pub prompt: Arc<PromptStore>,
    pub tools: Arc<ToolServerPool>,
    pub files: Arc<FilesStore>,
    pub dynamic: Arc<DynamicContextStore>,
    pub turns: Arc<TurnStore>,
    pub builder: ContextPackBuilder,
}

/// `{ systemPrompt, history[] }`.
pub struct BuiltContext {
    pub system_prompt: String,
    pub history: Vec<Message>,
}

impl ContextDeps {
    pub async fn build(&self, session: &Session) -> Result<BuiltContext> {
        let workspace = WorkspaceMetadata {
            id: self.workspace_id.clone(),
            name: self.workspace_name.clone(),
            path: self.workspace_path.clone(),
            description: self.workspace_description.clone(),
        };

        let prompt = self.prompt.get();
        let tools = self.tools.list_all_tools().await;
        let files = self.files.read_all();

        let mut dynamic_outputs = Vec::new();
        for dc in self.dynamic.list() {
            if !dc.refresh.enabled {
                continue;
            }
            let result = self
                .tools
                .invoke_tool(&dc.server_id, &dc.method_name, dc.params.clone())
                .await
                .map(|r| render_tool_result(&r))
                .map_err(|e| sa_domain::error::Error::from(e).to_string());
            dynamic_outputs.push(DynamicContextOutput {
                context_id: dc.context_id,
                server_name: dc.server_id,
                method_name: dc.method_name,
                result,
            });
        }

        let now = Utc::now().to_rfc3339();
        let (system_prompt, _report) =
            self.builder
                .build_context(&prompt, &workspace, &tools, &files, &dynamic_outputs, &now);

        let history = self.render_history(session)?;

        Ok(BuiltContext {
            system_prompt,
            history,
        })
    }

    /// Renders every round's request, plus whatever Turns have been
    /// persisted so far for its response, into `{role, content}` pairs.
    /// Called at the top of every loop iteration in `run_model_loop`, so a
    /// response's own earlier turns (including completed tool calls) are
    /// already visible here by the time the next turn is built — this is
    /// how step 3b's "accumulated tool-call results from earlier turns in
    /// this response" reach the model without a parallel in-memory buffer.
    fn render_history(&self, session: &Session) -> Result<Vec<Message>> {
        let mut messages = Vec::with_capacity(session.rounds.len() * 2);
        for round in &session.rounds {
            messages.push(Message::user(round.request.content.clone()));
            let turns = self.turns.for_response(&session.id, &round.response.id)?;
            for turn in turns {
                if !turn.content.is_empty() {
                    messages.push(Message::assistant(turn.content.clone()));
                }
                if let Some(call) = &turn.tool_calls.call {
                    if let Some(response) = &turn.tool_calls.response {
                        messages.push(Message::tool_result(
                            format!("{}.{}", call.server_name, call.method_name),
                            response.to_string(),
                        ));
                    }
                }
            }
        }
        Ok(messages)
    }
}

fn render_tool_result(result: &sa_tools::protocol::ToolCallResult) -> String {
    serde_json::to_string(&result.content).unwrap_or_default()
}
