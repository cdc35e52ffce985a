use sa_tools::ToolSummary;
use serde::{Deserialize, Serialize};

use crate::injection;
use crate::report::{ContextReport, DynamicContextReport, FileReport};
use crate::truncation::{self, Section};

/// Workspace prompt configuration — the per-workspace knobs that control
/// what `buildContext` assembles into the system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Free-form instructions prepended to the assembled prompt.
    #[serde(default)]
    pub instructions: String,
    #[serde(default = "default_true")]
    pub include_workspace_metadata: bool,
    #[serde(default = "default_true")]
    pub include_system_info: bool,
    #[serde(default = "default_true")]
    pub include_date_time: bool,
    #[serde(default = "default_true")]
    pub include_tools: bool,
    #[serde(default = "default_true")]
    pub include_files: bool,
    #[serde(default = "default_true")]
    pub include_dynamic_context: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            instructions: String::new(),
            include_workspace_metadata: true,
            include_system_info: true,
            include_date_time: true,
            include_tools: true,
            include_files: true,
            include_dynamic_context: true,
        }
    }
}

/// Identifying metadata for the owning workspace, used by the
/// `include-workspace-metadata` section.
#[derive(Debug, Clone)]
pub struct WorkspaceMetadata {
    pub id: String,
    pub name: String,
    pub path: String,
    pub description: Option<String>,
}

/// A workspace file to be injected (name + content, already read from disk).
#[derive(Debug, Clone)]
pub struct WorkspaceFile {
    pub name: String,
    /// `None` means the file was expected (active in the files store) but
    /// could not be read.
    pub content: Option<String>,
}

/// One dynamic-context method invocation, already resolved by the caller.
#[derive(Debug, Clone)]
pub struct DynamicContextOutput {
    pub context_id: String,
    pub server_name: String,
    pub method_name: String,
    /// `Ok(rendered)` on success, `Err(message)` if the tool invocation failed.
    pub result: Result<String, String>,
}

/// Deterministic context pack builder.
///
/// Assembles a session's `systemPrompt` from workspace prompt config, the
/// tool-use protocol description, active files, and dynamic-context method
/// outputs. Rendering the session history into `{role, content}` pairs is
/// the caller's job (it owns the Round/Turn records); this builder only
/// produces the prompt half of `buildContext`'s return value.
pub struct ContextPackBuilder {
    pub max_file_chars: usize,
    pub total_max_chars: usize,
}

impl ContextPackBuilder {
    pub fn new(max_file_chars: usize, total_max_chars: usize) -> Self {
        Self {
            max_file_chars,
            total_max_chars,
        }
    }

    /// Build the system prompt and its machine-readable report.
    ///
    /// `now` is the already-formatted RFC3339 timestamp for the
    /// `include-date-time` section (passed in rather than read here so the
    /// builder stays a pure function of its inputs).
    pub fn build_context(
        &self,
        prompt: &PromptConfig,
        workspace: &WorkspaceMetadata,
        tools: &[ToolSummary],
        files: &[WorkspaceFile],
        dynamic_contexts: &[DynamicContextOutput],
        now: &str,
    ) -> (String, ContextReport) {
        let mut assembled = String::new();

        if !prompt.instructions.is_empty() {
            assembled.push_str(&prompt.instructions);
            assembled.push_str("\n\n");
        }

        if prompt.include_workspace_metadata {
            assembled.push_str(&injection::format_workspace_metadata(
                &workspace.name,
                &workspace.id,
                &workspace.path,
                workspace.description.as_deref(),
            ));
            assembled.push('\n');
        }

        if prompt.include_system_info {
            assembled.push_str(&injection::format_system_info(
                std::env::consts::OS,
                std::env::consts::ARCH,
            ));
            assembled.push('\n');
        }

        if prompt.include_date_time {
            assembled.push_str(&injection::format_date_time(now));
            assembled.push('\n');
        }

        if prompt.include_tools && !tools.is_empty() {
            assembled.push_str(&injection::format_tool_protocol(tools));
            assembled.push('\n');
        }

        let mut file_reports: Vec<FileReport> = Vec::new();
        if prompt.include_files {
            let mut sections: Vec<Section> = files
                .iter()
                .map(|f| match &f.content {
                    Some(raw_content) => {
                        let raw_chars = raw_content.len();
                        let normalized = raw_content.replace("\r\n", "\n");
                        let (truncated_content, was_truncated) =
                            truncation::truncate_per_file(&normalized, self.max_file_chars);
                        Section {
                            filename: f.name.clone(),
                            content: truncated_content,
                            raw_chars,
                            truncated_per_file: was_truncated,
                            truncated_total_cap: false,
                            included: true,
                            missing: false,
                        }
                    }
                    None => Section {
                        filename: f.name.clone(),
                        content: String::new(),
                        raw_chars: 0,
                        truncated_per_file: false,
                        truncated_total_cap: false,
                        included: true,
                        missing: true,
                    },
                })
                .collect();

            truncation::apply_total_cap(&mut sections, self.total_max_chars);

            for section in &sections {
                file_reports.push(FileReport {
                    filename: section.filename.clone(),
                    raw_chars: section.raw_chars,
                    injected_chars: if section.included && !section.missing {
                        section.content.len()
                    } else {
                        0
                    },
                    truncated_per_file: section.truncated_per_file,
                    truncated_total_cap: section.truncated_total_cap,
                    included: section.included,
                    missing: section.missing,
                });

                if section.missing && section.included {
                    assembled.push_str(&injection::format_missing_marker(&section.filename));
                    assembled.push('\n');
                } else if section.included && !section.content.is_empty() {
                    assembled.push_str(&injection::format_workspace_section(
                        &section.filename,
                        &section.content,
                        section.raw_chars,
                        section.truncated_per_file,
                        section.truncated_total_cap,
                    ));
                    assembled.push('\n');
                }
            }
        }

        let mut dynamic_reports: Vec<DynamicContextReport> = Vec::new();
        if prompt.include_dynamic_context {
            for dc in dynamic_contexts {
                match &dc.result {
                    Ok(output) => {
                        assembled.push_str(&injection::format_dynamic_context(
                            &dc.context_id,
                            &dc.server_name,
                            &dc.method_name,
                            output,
                        ));
                        assembled.push('\n');
                        dynamic_reports.push(DynamicContextReport {
                            context_id: dc.context_id.clone(),
                            server_name: dc.server_name.clone(),
                            method_name: dc.method_name.clone(),
                            output_chars: output.len(),
                            included: true,
                            errored: false,
                        });
                    }
                    Err(message) => {
                        assembled.push_str(&injection::format_dynamic_context_error(
                            &dc.context_id,
                            &dc.server_name,
                            &dc.method_name,
                            message,
                        ));
                        assembled.push('\n');
                        dynamic_reports.push(DynamicContextReport {
                            context_id: dc.context_id.clone(),
                            server_name: dc.server_name.clone(),
                            method_name: dc.method_name.clone(),
                            output_chars: message.len(),
                            included: true,
                            errored: true,
                        });
                    }
                }
            }
        }

        let total_injected_chars = assembled.len();

        sa_domain::trace::TraceEvent::ContextBuilt {
            total_injected_chars,
            files_included: file_reports.iter().filter(|f| f.included && !f.missing).count(),
            files_truncated_per_file: file_reports.iter().filter(|f| f.truncated_per_file).count(),
            files_truncated_total_cap: file_reports.iter().filter(|f| f.truncated_total_cap).count(),
            files_excluded: file_reports.iter().filter(|f| !f.included).count(),
            tool_count: tools.len(),
            dynamic_context_count: dynamic_reports.len(),
        }
        .emit();

        let report = ContextReport {
            files: file_reports,
            dynamic_contexts: dynamic_reports,
            tool_count: tools.len(),
            total_injected_chars,
        };

        (assembled, report)
    }
}
