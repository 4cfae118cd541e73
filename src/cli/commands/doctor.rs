//! Doctor command - verify configuration and external requirements.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::storage::StorageTarget;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Marquee Doctor");
    println!();
    println!("Checking configuration and tool servers...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Configuration").bold());
    let api_check = check_openai_api_key();
    api_check.print();
    checks.push(api_check);

    println!();

    println!("{}", style("MCP Servers").bold());
    let server_checks = check_servers(settings);
    for check in &server_checks {
        check.print();
    }
    checks.extend(server_checks);

    println!();

    println!("{}", style("Storage").bold());
    let storage_check = check_storage(&settings.storage.url);
    storage_check.print();
    checks.push(storage_check);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Marquee.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Marquee is ready to use.");
    }

    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.chars().count() > 20 => {
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", mask_key(&key)))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// First seven and last four characters of a key.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 11 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check each server's command and placeholder variables.
fn check_servers(settings: &Settings) -> Vec<CheckResult> {
    if settings.mcp.servers.is_empty() {
        return vec![CheckResult::error(
            "Servers",
            "none configured",
            "Add a [mcp.servers.<name>] section, or run: marquee config init",
        )];
    }

    let mut results = Vec::new();
    for (name, server) in &settings.mcp.servers {
        match preflight::find_command(&server.command) {
            Some(path) => results.push(CheckResult::ok(
                name,
                &format!("{} ({})", server.command, path.display()),
            )),
            None => results.push(CheckResult::error(
                name,
                &format!("command '{}' not found", server.command),
                install_hint(&server.command),
            )),
        }

        if let Err(e) = preflight::check_placeholders(name, server) {
            results.push(CheckResult::error(
                &format!("{} credentials", name),
                &e.to_string(),
                "Export the variable before starting marquee",
            ));
        }
    }
    results
}

fn check_storage(url: &str) -> CheckResult {
    match url.parse::<StorageTarget>() {
        Ok(StorageTarget::Memory) => CheckResult::ok("Storage", ":memory: (not persisted)"),
        Ok(StorageTarget::File(path)) if path.exists() => {
            let size = std::fs::metadata(&path)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "unknown size".to_string());
            CheckResult::ok("Storage", &format!("{} ({})", path.display(), size))
        }
        Ok(StorageTarget::File(path)) => CheckResult::warning(
            "Storage",
            &format!("{} (not created yet)", path.display()),
            "Database will be created on first run",
        ),
        Err(e) => CheckResult::error(
            "Storage",
            &e.to_string(),
            "Use ':memory:' or 'file:<path>' for storage.url",
        ),
    }
}

fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: marquee config init",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn install_hint(command: &str) -> &'static str {
    match command {
        "npx" | "node" | "npm" => {
            if cfg!(target_os = "macos") {
                "Install Node.js with: brew install node"
            } else if cfg!(target_os = "linux") {
                "Install Node.js with: sudo apt install nodejs npm (or your package manager)"
            } else {
                "Install Node.js from: https://nodejs.org"
            }
        }
        "uvx" | "uv" => "Install uv from: https://docs.astral.sh/uv/",
        _ => "Check the command in the server's config section",
    }
}
