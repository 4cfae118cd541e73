//! Pre-flight checks before starting tool servers.
//!
//! Catches missing credentials and commands up front instead of failing
//! halfway through discovery.

use crate::config::{McpServerSettings, Settings};
use crate::error::{MarqueeError, Result};
use std::path::PathBuf;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Listing tools needs the servers' commands and placeholders.
    Tools,
    /// Asking also needs the OpenAI key.
    Ask,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    if let Operation::Ask = operation {
        check_api_key()?;
    }

    for (name, server) in &settings.mcp.servers {
        check_placeholders(name, server)?;
        if find_command(&server.command).is_none() {
            return Err(MarqueeError::Config(format!(
                "command '{}' for MCP server '{}' was not found on PATH",
                server.command, name
            )));
        }
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
pub fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(MarqueeError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(MarqueeError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check that every `${VAR}` in a server's args and env is defined.
pub fn check_placeholders(name: &str, server: &McpServerSettings) -> Result<()> {
    server
        .resolved_args()
        .and_then(|_| server.resolved_env())
        .map(|_| ())
        .map_err(|e| MarqueeError::Config(format!("MCP server '{}': {}", name, e)))
}

/// Resolve a command the way the OS would when spawning it, honoring
/// executable bits and `PATHEXT`.
pub fn find_command(command: &str) -> Option<PathBuf> {
    which::which(command).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn server(command: &str, args: &[&str]) -> McpServerSettings {
        McpServerSettings {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: BTreeMap::new(),
            timeout_ms: 1_000,
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_find_command() {
        assert!(find_command("sh").is_some());
        assert!(find_command("/bin/sh").is_some());
        assert!(find_command("marquee-no-such-command").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_command_skips_non_executable_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("movie-server");
        std::fs::write(&script, "not a program").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(find_command(script.to_str().unwrap()).is_none());

        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(find_command(script.to_str().unwrap()).is_some());
    }

    #[test]
    fn test_missing_placeholder_names_server() {
        let server = server("sh", &["--key", "${MARQUEE_PREFLIGHT_UNSET}"]);
        let err = check_placeholders("moviemcp", &server).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("moviemcp"));
        assert!(message.contains("MARQUEE_PREFLIGHT_UNSET"));
    }

    #[cfg(unix)]
    #[test]
    fn test_tools_check_passes_without_api_key() {
        let mut settings = Settings::default();
        settings.mcp.servers = BTreeMap::from([("local".to_string(), server("sh", &["-c", "true"]))]);
        assert!(check(Operation::Tools, &settings).is_ok());
    }
}
