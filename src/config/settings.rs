//! Configuration settings for Marquee.

use crate::error::{MarqueeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::prompts::DEFAULT_INSTRUCTIONS;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub agent: AgentSettings,
    pub model: ModelSettings,
    pub storage: StorageSettings,
    pub logger: LoggerSettings,
    pub mcp: McpSettings,
}

/// Identity and prompt of the registered agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Display name of the agent.
    pub name: String,
    /// Key the agent is registered under in the host.
    pub key: String,
    /// Instruction prompt, used verbatim.
    pub instructions: String,
    /// Optional file whose contents replace `instructions`.
    pub instructions_file: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: "Movie Assistant".to_string(),
            key: "movieAgent".to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            instructions_file: None,
        }
    }
}

impl AgentSettings {
    /// Resolve the instruction prompt, reading the override file if one is set.
    pub fn resolve_instructions(&self) -> Result<String> {
        match &self.instructions_file {
            Some(path) => Ok(std::fs::read_to_string(Settings::expand_path(path))?),
            None => Ok(self.instructions.clone()),
        }
    }
}

/// Hosted language model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model provider (openai).
    pub provider: String,
    /// Model name, passed through to the provider untouched.
    pub name: String,
    /// Maximum model round-trips per agent run.
    pub max_iterations: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            name: "gpt-3.5-turbo".to_string(),
            max_iterations: 10,
        }
    }
}

/// Host bookkeeping storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `:memory:` for a throwaway store, `file:<path>` or a plain path to persist.
    pub url: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            url: ":memory:".to_string(),
        }
    }
}

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerSettings {
    /// Logger name, attached to the root span.
    pub name: String,
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            name: "Marquee".to_string(),
            level: "info".to_string(),
        }
    }
}

/// MCP tool server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpSettings {
    /// Tool servers keyed by server name.
    pub servers: BTreeMap<String, McpServerSettings>,
}

impl Default for McpSettings {
    fn default() -> Self {
        let mut servers = BTreeMap::new();
        servers.insert("moviemcp".to_string(), McpServerSettings::default());
        Self { servers }
    }
}

/// How to launch and reach one MCP tool server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct McpServerSettings {
    /// Executable to launch.
    pub command: String,
    /// Arguments; `${VAR}` placeholders are expanded from the environment.
    pub args: Vec<String>,
    /// Extra environment for the child; values are expanded like `args`.
    pub env: BTreeMap<String, String>,
    /// Timeout for the handshake and for each request, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for McpServerSettings {
    fn default() -> Self {
        Self {
            command: "npx".to_string(),
            args: [
                "-y",
                "@smithery/cli@latest",
                "run",
                "@Arliiii/moviemcp",
                "--key",
                "${SMITHERY_API_KEY}",
                "--profile",
                "${SMITHERY_PROFILE}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            env: BTreeMap::new(),
            timeout_ms: 30_000,
        }
    }
}

impl McpServerSettings {
    /// Timeout as a `Duration`.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    /// Arguments with environment placeholders expanded.
    pub fn resolved_args(&self) -> Result<Vec<String>> {
        self.args.iter().map(|a| expand_env(a)).collect()
    }

    /// Environment with placeholders expanded.
    pub fn resolved_env(&self) -> Result<BTreeMap<String, String>> {
        self.env
            .iter()
            .map(|(k, v)| Ok((k.clone(), expand_env(v)?)))
            .collect()
    }
}

/// Expand `$VAR` / `${VAR}` from the process environment.
pub fn expand_env(value: &str) -> Result<String> {
    shellexpand::env(value)
        .map(|s| s.into_owned())
        .map_err(|e| {
            MarqueeError::Config(format!(
                "environment variable {} is not set (referenced in '{}')",
                e.var_name, value
            ))
        })
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MarqueeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("marquee")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.agent.name, "Movie Assistant");
        assert_eq!(settings.agent.key, "movieAgent");
        assert_eq!(settings.model.name, "gpt-3.5-turbo");
        assert_eq!(settings.storage.url, ":memory:");
        assert_eq!(settings.logger.level, "info");

        let server = &settings.mcp.servers["moviemcp"];
        assert_eq!(server.timeout_ms, 30_000);
        assert!(server.args.iter().any(|a| a == "${SMITHERY_API_KEY}"));
    }

    #[test]
    fn test_parse_partial_toml() {
        let settings: Settings = toml::from_str(
            r#"
            [model]
            name = "gpt-4o-mini"

            [storage]
            url = "file:./marquee.db"

            [mcp.servers.local]
            command = "movie-server"
            args = ["--stdio"]
            timeout_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(settings.model.name, "gpt-4o-mini");
        assert_eq!(settings.model.max_iterations, 10);
        assert_eq!(settings.storage.url, "file:./marquee.db");
        assert_eq!(settings.mcp.servers.len(), 1);
        let local = &settings.mcp.servers["local"];
        assert_eq!(local.command, "movie-server");
        assert_eq!(local.timeout(), std::time::Duration::from_millis(500));
        assert_eq!(settings.agent.instructions, DEFAULT_INSTRUCTIONS);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.logger.name = "Reel".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.logger.name, "Reel");
        assert_eq!(loaded.mcp.servers, settings.mcp.servers);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = PathBuf::from("/nonexistent/marquee/config.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.agent.name, "Movie Assistant");
    }

    #[test]
    fn test_expand_env_placeholders() {
        std::env::set_var("MARQUEE_TEST_PROFILE", "noisy-primate");
        let server = McpServerSettings {
            command: "sh".to_string(),
            args: vec!["--profile".to_string(), "${MARQUEE_TEST_PROFILE}".to_string()],
            env: BTreeMap::from([("PROFILE".to_string(), "$MARQUEE_TEST_PROFILE".to_string())]),
            timeout_ms: 100,
        };

        assert_eq!(
            server.resolved_args().unwrap(),
            vec!["--profile".to_string(), "noisy-primate".to_string()]
        );
        assert_eq!(server.resolved_env().unwrap()["PROFILE"], "noisy-primate");
    }

    #[test]
    fn test_expand_env_missing_variable() {
        let err = expand_env("${MARQUEE_TEST_DEFINITELY_UNSET}").unwrap_err();
        assert!(err.to_string().contains("MARQUEE_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn test_instructions_file_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        std::fs::write(&path, "  Only talk about noir.\n").unwrap();

        let agent = AgentSettings {
            instructions_file: Some(path.to_string_lossy().to_string()),
            ..AgentSettings::default()
        };
        assert_eq!(agent.resolve_instructions().unwrap(), "  Only talk about noir.\n");
    }
}
