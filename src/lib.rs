//! Marquee - a movie assistant backed by MCP tool servers
//!
//! Marquee starts the tool servers named in its configuration, discovers the
//! tools they advertise over the Model Context Protocol, and hands them to a
//! chat-completions agent that answers questions about films and shows.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `mcp` - MCP client, stdio transport and multi-server tool registry
//! - `agent` - Agent definition and the tool calling loop
//! - `host` - Agent registration with logger and storage
//! - `storage` - Host bookkeeping (in memory or SQLite file)
//! - `bootstrap` - Startup sequence tying the above together
//!
//! # Example
//!
//! ```rust,no_run
//! use marquee::bootstrap;
//! use marquee::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let runtime = bootstrap::start(&settings).await?;
//!
//!     let runner = runtime.runner(&settings.agent.key)?;
//!     let response = runner.run("Recommend a heist movie from the 90s").await?;
//!     println!("{}", response.content);
//!
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod mcp;
pub mod openai;
pub mod storage;

pub use error::{MarqueeError, Result};
