use sa_tools::ToolSummary;

/// Format the workspace-metadata section (`include-workspace-metadata`).
pub fn format_workspace_metadata(name: &str, id: &str, path: &str, description: Option<&str>) -> String {
    let desc_line = description
        .map(|d| format!("Description: {d}\n"))
        .unwrap_or_default();
    format!(
        "\
=== WORKSPACE ===
Name: {name}
ID: {id}
Path: {path}
{desc_line}=== END_WORKSPACE ===
"
    )
}

/// Format the system-info section (`include-system-info`).
pub fn format_system_info(os: &str, arch: &str) -> String {
    format!(
        "\
=== SYSTEM_INFO ===
OS: {os}
Arch: {arch}
=== END_SYSTEM_INFO ===
"
    )
}

/// Format the date/time section (`include-date-time`).
pub fn format_date_time(rfc3339: &str) -> String {
    format!(
        "\
=== DATE_TIME ===
{rfc3339}
=== END_DATE_TIME ===
"
    )
}

/// Format the tool-use protocol description (`include-tools`).
///
/// Lists every tool the pool exposes along with its JSON schema, and the
/// invocation convention the model is expected to follow.
pub fn format_tool_protocol(tools: &[ToolSummary]) -> String {
    let mut out = String::from(
        "\
=== TOOL_USE_PROTOCOL ===
To call a tool, respond with a single JSON object of the form:
{\"server\": \"<server>\", \"method\": \"<method>\", \"arguments\": { ... }}
Available tools:
",
    );
    for tool in tools {
        out.push_str(&format!(
            "- {}.{}: {}\n  schema: {}\n",
            tool.server, tool.name, tool.description, tool.schema
        ));
    }
    out.push_str("=== END_TOOL_USE_PROTOCOL ===\n");
    out
}

/// Format a workspace file section with machine-inspectable delimiters.
pub fn format_workspace_section(
    filename: &str,
    content: &str,
    raw_chars: usize,
    truncated_per_file: bool,
    truncated_total_cap: bool,
) -> String {
    let injected_chars = content.len();
    format!(
        "\
=== WORKSPACE_FILE: {filename} ===
RAW_CHARS: {raw_chars}
INJECTED_CHARS: {injected_chars}
TRUNCATED_PER_FILE: {truncated_per_file}
TRUNCATED_TOTAL_CAP: {truncated_total_cap}
--- BEGIN ---
{content}
--- END ---
"
    )
}

/// Format a missing-file marker (file expected but not found in workspace).
pub fn format_missing_marker(filename: &str) -> String {
    format!(
        "\
=== WORKSPACE_FILE: {filename} ===
MISSING: true
--- BEGIN ---
[FILE NOT FOUND]
--- END ---
"
    )
}

/// Format one dynamic-context method output (`include-dynamic-context`).
pub fn format_dynamic_context(
    context_id: &str,
    server_name: &str,
    method_name: &str,
    content: &str,
) -> String {
    format!(
        "\
=== DYNAMIC_CONTEXT: {context_id} ({server_name}.{method_name}) ===
{content}
=== END_DYNAMIC_CONTEXT: {context_id} ===
"
    )
}

/// Format a dynamic-context invocation failure marker.
pub fn format_dynamic_context_error(context_id: &str, server_name: &str, method_name: &str, error: &str) -> String {
    format!(
        "\
=== DYNAMIC_CONTEXT: {context_id} ({server_name}.{method_name}) ===
[ERROR: {error}]
=== END_DYNAMIC_CONTEXT: {context_id} ===
"
    )
}
