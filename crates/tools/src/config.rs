//! Tool-server configuration types — re-exported from `sa-domain`.
//!
//! The canonical definitions live in `sa_domain::config` so that workspace
//! config deserialization can include them without depending on the full
//! tool-pool crate.

pub use sa_domain::config::{McpConfig, McpServerConfig, McpTransportKind, ToolConfigSet};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_defaults() {
        let cfg: McpConfig = serde_json::from_str("{}").unwrap();
        assert!(cfg.servers.is_empty());
    }

    #[test]
    fn deserialize_server_config() {
        let raw = r#"{
            "id": "filesystem",
            "command": "npx",
            "args": ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"],
            "transport": "stdio"
        }"#;
        let cfg: McpServerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.id, "filesystem");
        assert_eq!(cfg.command, "npx");
        assert_eq!(cfg.args.len(), 3);
        assert_eq!(cfg.transport, McpTransportKind::Stdio);
        assert!(cfg.auto_approve.is_empty());
        assert!(!cfg.disabled);
    }

    #[test]
    fn transport_kind_defaults_to_stdio() {
        let raw = r#"{ "id": "test", "command": "echo" }"#;
        let cfg: McpServerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.transport, McpTransportKind::Stdio);
    }

    #[test]
    fn sse_transport() {
        let raw = r#"{ "id": "remote", "transport": "sse", "url": "http://localhost:8080/sse" }"#;
        let cfg: McpServerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.transport, McpTransportKind::Sse);
        assert_eq!(cfg.url.as_deref(), Some("http://localhost:8080/sse"));
    }

    #[test]
    fn deserialize_with_env() {
        let raw = r#"{
            "id": "test",
            "command": "node",
            "args": ["server.js"],
            "env": { "NODE_ENV": "production" }
        }"#;
        let cfg: McpServerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.env.get("NODE_ENV").unwrap(), "production");
    }

    #[test]
    fn disabled_and_auto_approve_round_trip() {
        let raw = r#"{
            "id": "danger",
            "command": "rm",
            "disabled": true,
            "auto_approve": ["read_file"]
        }"#;
        let cfg: McpServerConfig = serde_json::from_str(raw).unwrap();
        assert!(cfg.disabled);
        assert_eq!(cfg.auto_approve, vec!["read_file".to_string()]);
    }

    #[test]
    fn matches_ignores_auto_approve_but_not_disabled() {
        let a: McpServerConfig = serde_json::from_str(
            r#"{"id":"s","command":"npx","auto_approve":["a"]}"#,
        )
        .unwrap();
        let b: McpServerConfig = serde_json::from_str(
            r#"{"id":"s","command":"npx","auto_approve":["a","b"]}"#,
        )
        .unwrap();
        assert!(a.matches(&b));

        let c: McpServerConfig =
            serde_json::from_str(r#"{"id":"s","command":"npx","disabled":true}"#).unwrap();
        assert!(!a.matches(&c));
    }
}
