//! Multi-server tool discovery and dispatch.

use super::client::McpClient;
use super::tools::{ToolDescriptor, ToolOutput, ToolSet};
use crate::agent::ToolInvoker;
use crate::config::McpServerSettings;
use crate::error::{MarqueeError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};

/// Connected tool servers and the tools they advertise.
pub struct ToolRegistry {
    clients: BTreeMap<String, McpClient>,
    tools: Arc<ToolSet>,
}

impl ToolRegistry {
    /// Connect every configured server and collect its tools.
    ///
    /// Any failure aborts discovery and stops the servers already started, so
    /// callers never see a partial tool set.
    #[instrument(skip_all, fields(servers = servers.len()))]
    pub async fn discover(servers: &BTreeMap<String, McpServerSettings>) -> Result<Self> {
        if servers.is_empty() {
            return Err(MarqueeError::Config(
                "no MCP servers configured under [mcp.servers]".to_string(),
            ));
        }

        let mut clients = BTreeMap::new();
        let mut descriptors = Vec::new();
        let mut taken = HashSet::new();

        for (name, settings) in servers {
            info!("Connecting to MCP server '{}' ({})", name, settings.command);

            let discovered = match McpClient::connect(name, settings).await {
                Ok(client) => {
                    let listed = client.list_tools().await;
                    clients.insert(name.clone(), client);
                    listed
                }
                Err(e) => Err(e),
            };

            let tools = match discovered {
                Ok(tools) if tools.is_empty() => Err(MarqueeError::discovery(
                    name,
                    "server advertised no tools",
                )),
                Ok(tools) => claim_keys(name, &tools, &mut taken).map(|_| tools),
                Err(e) => Err(e),
            };

            match tools {
                Ok(tools) => {
                    info!("Discovered {} tools on '{}'", tools.len(), name);
                    descriptors.extend(tools);
                }
                Err(e) => {
                    for client in clients.values() {
                        client.shutdown().await;
                    }
                    return Err(e);
                }
            }
        }

        let tools = match ToolSet::new(descriptors) {
            Ok(tools) => tools,
            Err(e) => {
                for client in clients.values() {
                    client.shutdown().await;
                }
                return Err(e);
            }
        };

        Ok(Self {
            clients,
            tools: Arc::new(tools),
        })
    }

    /// The discovered tools.
    pub fn tools(&self) -> Arc<ToolSet> {
        self.tools.clone()
    }

    /// Names of the connected servers.
    pub fn servers(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    /// Get the client for one server.
    pub fn client(&self, server: &str) -> Option<&McpClient> {
        self.clients.get(server)
    }

    /// Stop every server process.
    pub async fn shutdown(&self) {
        for client in self.clients.values() {
            client.shutdown().await;
        }
    }
}

/// Reserve the qualified keys of one server's tools. A key already taken by
/// an earlier server fails discovery for this one.
fn claim_keys(server: &str, tools: &[ToolDescriptor], taken: &mut HashSet<String>) -> Result<()> {
    for tool in tools {
        let key = tool.qualified_name();
        if !taken.insert(key.clone()) {
            return Err(MarqueeError::discovery(
                server,
                format!("tool '{}' collides with an existing tool named '{}'", tool.name, key),
            ));
        }
    }
    Ok(())
}

#[async_trait]
impl ToolInvoker for ToolRegistry {
    async fn invoke(&self, tool: &str, arguments: Value) -> Result<ToolOutput> {
        let descriptor = self
            .tools
            .get(tool)
            .ok_or_else(|| MarqueeError::UnknownTool(tool.to_string()))?;

        let client = self
            .clients
            .get(&descriptor.server)
            .ok_or_else(|| MarqueeError::UnknownTool(tool.to_string()))?;

        client.call_tool(&descriptor.name, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::testing::{fake_server, handshake, movie_server, reply, tools_response, HOLD};
    use serde_json::json;

    #[tokio::test]
    async fn test_discover_requires_servers() {
        let err = ToolRegistry::discover(&BTreeMap::new()).await.err().unwrap();
        assert!(matches!(err, MarqueeError::Config(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_discover_multiple_servers() {
        let servers = BTreeMap::from([
            ("moviemcp".to_string(), movie_server(&["search_movies", "get_movie_details"])),
            ("tv".to_string(), movie_server(&["search_tv_shows"])),
        ]);

        let registry = ToolRegistry::discover(&servers).await.unwrap();
        let tools = registry.tools();
        assert_eq!(
            tools.names(),
            vec!["moviemcp_get_movie_details", "moviemcp_search_movies", "tv_search_tv_shows"]
        );
        assert_eq!(registry.servers().collect::<Vec<_>>(), vec!["moviemcp", "tv"]);
        registry.shutdown().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_one_unreachable_server_fails_discovery() {
        let mut broken = movie_server(&["search_tv_shows"]);
        broken.command = "/nonexistent/tv-server".to_string();

        let servers = BTreeMap::from([
            ("moviemcp".to_string(), movie_server(&["search_movies"])),
            ("tv".to_string(), broken),
        ]);

        let err = ToolRegistry::discover(&servers).await.err().unwrap();
        match err {
            MarqueeError::ToolDiscovery { server, .. } => assert_eq!(server, "tv"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_listing_fails_discovery() {
        let servers = BTreeMap::from([("moviemcp".to_string(), movie_server(&[]))]);
        let err = ToolRegistry::discover(&servers).await.err().unwrap();
        assert!(err.to_string().contains("advertised no tools"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_duplicate_listing_fails_discovery() {
        let servers = BTreeMap::from([(
            "moviemcp".to_string(),
            movie_server(&["search_movies", "search_movies"]),
        )]);

        match ToolRegistry::discover(&servers).await.err().unwrap() {
            MarqueeError::ToolDiscovery { server, reason } => {
                assert_eq!(server, "moviemcp");
                assert!(reason.contains("search_movies"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_key_collision_across_servers_names_later_server() {
        let servers = BTreeMap::from([
            ("movie".to_string(), movie_server(&["db_search"])),
            ("movie_db".to_string(), movie_server(&["search"])),
        ]);

        match ToolRegistry::discover(&servers).await.err().unwrap() {
            MarqueeError::ToolDiscovery { server, reason } => {
                assert_eq!(server, "movie_db");
                assert!(reason.contains("movie_db_search"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_long_names_with_shared_prefix_both_register() {
        let alpha = format!("{}_alpha", "x".repeat(60));
        let beta = format!("{}_beta", "x".repeat(60));
        let servers = BTreeMap::from([(
            "moviemcp".to_string(),
            movie_server(&[alpha.as_str(), beta.as_str()]),
        )]);

        let registry = ToolRegistry::discover(&servers).await.unwrap();
        let tools = registry.tools();
        assert_eq!(tools.len(), 2);
        assert!(tools.names().iter().all(|n| n.len() <= 64));
        registry.shutdown().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_routes_to_owning_server() {
        let call_result = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {"content": [{"type": "text", "text": "Trending: Dune"}]}
        });
        let script = format!(
            "{} {} {} {}",
            handshake(),
            reply(&tools_response(2, &["get_trending"], None)),
            reply(&call_result),
            HOLD
        );
        let servers = BTreeMap::from([("moviemcp".to_string(), fake_server(&script, 2_000))]);
        let registry = ToolRegistry::discover(&servers).await.unwrap();

        let output = registry
            .invoke("moviemcp_get_trending", json!({"media_type": "movie"}))
            .await
            .unwrap();
        assert_eq!(output.text, "Trending: Dune");

        let err = registry.invoke("moviemcp_unknown", json!({})).await.unwrap_err();
        assert!(matches!(err, MarqueeError::UnknownTool(_)));
    }
}
