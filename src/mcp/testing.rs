//! Scripted stand-in MCP servers for tests.
//!
//! Each server is an `sh -c` script that reads one request line per step and
//! prints a canned response. Request ids start at 1 (`initialize`).

use crate::config::McpServerSettings;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Keep the server alive until the client closes stdin.
pub const HOLD: &str = "cat > /dev/null";

/// Server settings that run `script` under `sh`.
pub fn fake_server(script: &str, timeout_ms: u64) -> McpServerSettings {
    McpServerSettings {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        env: BTreeMap::new(),
        timeout_ms,
    }
}

/// Wait for one request and answer with `message`.
pub fn reply(message: &Value) -> String {
    format!("read l; printf '%s\\n' '{}';", message)
}

/// Answer `initialize` and swallow the `initialized` notification.
pub fn handshake() -> String {
    format!("{} read l;", reply(&init_response(1)))
}

pub fn init_response(id: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": "fake-movies", "version": "0.0.1"},
            "instructions": "Search by title before asking for details."
        }
    })
}

pub fn tools_response(id: u64, names: &[&str], next_cursor: Option<&str>) -> Value {
    let tools: Vec<Value> = names
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "description": format!("{} from the fake server", name),
                "inputSchema": {
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }
            })
        })
        .collect();

    let mut result = json!({ "tools": tools });
    if let Some(cursor) = next_cursor {
        result["nextCursor"] = json!(cursor);
    }
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

/// A server that completes the handshake and advertises `names`.
pub fn movie_server(names: &[&str]) -> McpServerSettings {
    let script = format!(
        "{} {} {}",
        handshake(),
        reply(&tools_response(2, names, None)),
        HOLD
    );
    fake_server(&script, 2_000)
}
