//! Stdio transport: newline-delimited JSON over a child process's pipes.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

/// A launched MCP server process.
pub struct StdioTransport {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl StdioTransport {
    /// Launch `command` with piped stdio. The server's stderr is forwarded to the log.
    pub fn spawn(
        server: &str,
        command: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> io::Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| pipe_missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| pipe_missing("stdout"))?;

        if let Some(stderr) = child.stderr.take() {
            let server = server.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(server = %server, "stderr: {}", line);
                }
            });
        }

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
        })
    }

    /// Write one message followed by a newline.
    pub async fn send<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"))?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await
    }

    /// Read the next line; `None` once the server closed its stdout.
    pub async fn recv(&mut self) -> io::Result<Option<String>> {
        self.stdout.next_line().await
    }

    /// Close stdin and terminate the process.
    pub async fn close(&mut self) {
        self.stdin.take();
        if let Err(e) = self.child.kill().await {
            debug!("MCP server already exited: {}", e);
        }
    }
}

fn pipe_missing(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("child {} was not captured", name))
}
