use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Root
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Configures where `RootManager` roots its on-disk state: `root.json`,
/// per-workspace directories under `workspaces/<name>/`, and so on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootConfig {
    #[serde(default = "d_root_path")]
    pub path: PathBuf,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            path: d_root_path(),
        }
    }
}

/// `$ROOT_PATH` env override, falling back to `$HOME/.mandrake`.
fn d_root_path() -> PathBuf {
    std::env::var("ROOT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".mandrake")
        })
}
