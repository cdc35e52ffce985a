use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context pack caps — feeds `ContextPackBuilder::new(file_max_chars, total_max_chars)`.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Per-file truncation cap applied to each injected workspace file.
    #[serde(default = "d_20000")]
    pub file_max_chars: usize,
    /// Cap applied across the sum of all injected file content.
    #[serde(default = "d_24000")]
    pub total_max_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            file_max_chars: 20_000,
            total_max_chars: 24_000,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_20000() -> usize {
    20_000
}
fn d_24000() -> usize {
    24_000
}
