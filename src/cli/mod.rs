//! CLI module for Marquee.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{preview, Output};

use clap::{Parser, Subcommand};

/// Marquee - a movie assistant backed by MCP tool servers
///
/// Discovers tools from the configured MCP servers and exposes them to a
/// chat-completions agent.
#[derive(Parser, Debug)]
#[command(name = "marquee")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "MARQUEE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to the configured MCP servers and list their tools
    Tools,

    /// Ask the movie assistant a single question
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start an interactive chat session
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Check configuration and external requirements
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_model() {
        let cli = Cli::parse_from(["marquee", "-vv", "ask", "Any good heist movies?", "-m", "gpt-4o"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask { question, model } => {
                assert_eq!(question, "Any good heist movies?");
                assert_eq!(model.as_deref(), Some("gpt-4o"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::parse_from(["marquee", "--config", "/tmp/m.toml", "config", "init", "--force"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/m.toml"));
        assert!(matches!(
            cli.command,
            Commands::Config { action: ConfigAction::Init { force: true } }
        ));
    }
}
