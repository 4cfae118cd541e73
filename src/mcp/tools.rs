//! Tool descriptors discovered from MCP servers.

use crate::error::{MarqueeError, Result};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Longest function name the chat-completions API accepts.
const MAX_TOOL_NAME_LEN: usize = 64;

/// Hex digits of the digest appended to shortened keys.
const DIGEST_SUFFIX_LEN: usize = 8;

static INVALID_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("static regex"));

/// One callable tool exposed by a server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    /// Name of the server that advertised the tool.
    pub server: String,
    /// Tool name as the server knows it.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// JSON schema of the tool's arguments.
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Key the tool is exposed under: `{server}_{name}`, restricted to
    /// `[A-Za-z0-9_-]` and 64 characters.
    ///
    /// Keys that would exceed the limit are shortened and suffixed with a
    /// digest of the full name, so distinct tools keep distinct keys.
    pub fn qualified_name(&self) -> String {
        let raw = format!("{}_{}", self.server, self.name);
        let key = INVALID_NAME_CHARS.replace_all(&raw, "_").into_owned();
        if key.len() <= MAX_TOOL_NAME_LEN {
            return key;
        }

        let digest = hex::encode(Sha256::digest(raw.as_bytes()));
        let keep = MAX_TOOL_NAME_LEN - DIGEST_SUFFIX_LEN - 1;
        format!("{}_{}", &key[..keep], &digest[..DIGEST_SUFFIX_LEN])
    }
}

/// Read-only collection of tools, keyed by qualified name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSet {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolSet {
    /// Build a tool set. Two tools mapping to the same qualified name is an error.
    pub fn new(descriptors: impl IntoIterator<Item = ToolDescriptor>) -> Result<Self> {
        let mut tools = BTreeMap::new();
        for descriptor in descriptors {
            let key = descriptor.qualified_name();
            if let Some(existing) = tools.insert(key.clone(), descriptor) {
                return Err(MarqueeError::Config(format!(
                    "tool '{}' from server '{}' collides with an existing tool named '{}'",
                    existing.name, existing.server, key
                )));
            }
        }
        Ok(Self { tools })
    }

    pub fn get(&self, qualified_name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(qualified_name)
    }

    /// Iterate `(qualified name, descriptor)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ToolDescriptor)> {
        self.tools.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Tools advertised by one server.
    pub fn for_server<'a>(&'a self, server: &'a str) -> impl Iterator<Item = &'a ToolDescriptor> {
        self.tools.values().filter(move |t| t.server == server)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Result of a tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Text rendering of the returned content.
    pub text: String,
    /// The server flagged the call as failed.
    pub is_error: bool,
}
