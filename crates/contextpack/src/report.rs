use serde::{Deserialize, Serialize};

/// Per-file report within the context pack build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub filename: String,
    pub raw_chars: usize,
    pub injected_chars: usize,
    pub truncated_per_file: bool,
    pub truncated_total_cap: bool,
    pub included: bool,
    /// True if the file was expected but missing from the workspace.
    pub missing: bool,
}

/// Per-dynamic-context report within the context pack build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicContextReport {
    pub context_id: String,
    pub server_name: String,
    pub method_name: String,
    pub output_chars: usize,
    pub included: bool,
    /// True if the method invocation failed; `output_chars` then reflects the
    /// rendered error marker instead of real output.
    pub errored: bool,
}

/// Full report of a context pack build — returned by `GET /v1/context`-style
/// introspection endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextReport {
    pub files: Vec<FileReport>,
    pub dynamic_contexts: Vec<DynamicContextReport>,
    pub tool_count: usize,
    pub total_injected_chars: usize,
}
