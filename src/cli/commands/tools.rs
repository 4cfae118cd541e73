//! Tools command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{preview, Output};
use crate::config::Settings;
use crate::mcp::ToolRegistry;
use anyhow::Result;

/// Discover tools on every configured server and print them.
pub async fn run_tools(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Tools, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'marquee doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let spinner = Output::spinner("Connecting to MCP servers...");
    let registry = match ToolRegistry::discover(&settings.mcp.servers).await {
        Ok(registry) => {
            spinner.finish_and_clear();
            registry
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let tools = registry.tools();
    for server in registry.servers() {
        let client = registry.client(server);
        let header = match client.and_then(|c| c.server_info()) {
            Some(info) => format!("{} ({} {})", server, info.name, info.version),
            None => server.to_string(),
        };
        Output::header(&header);
        if let Some(instructions) = client.and_then(|c| c.instructions()) {
            println!("  {}", console::style(preview(instructions, 100)).dim());
        }

        for descriptor in tools.for_server(server) {
            Output::tool(&descriptor.qualified_name(), descriptor.description.as_deref());
        }
    }

    println!();
    Output::success(&format!(
        "{} tools from {} server(s)",
        tools.len(),
        registry.servers().count()
    ));

    registry.shutdown().await;
    Ok(())
}
