//! Interactive chat command.

use super::{record_generation, start_runtime};
use crate::agent::{AgentRunner, History};
use crate::bootstrap::Runtime;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use async_openai::types::ChatCompletionRequestMessage;
use console::style;
use std::io::{self, BufRead, Write};

/// Keep at most this many history messages between turns.
const MAX_HISTORY: usize = 30;

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'marquee doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.model.name = model;
    }

    let runtime = start_runtime(&settings).await?;
    let result = match runtime.runner(&settings.agent.key) {
        Ok(runner) => chat_loop(&runtime, &runner, &settings.agent.key).await,
        Err(e) => Err(e.into()),
    };
    runtime.shutdown().await;
    result
}

async fn chat_loop(runtime: &Runtime, runner: &AgentRunner, key: &str) -> Result<()> {
    let name = runner.agent().name().to_string();

    println!("\n{}", style(&name).bold().cyan());
    println!(
        "{}\n",
        style(format!(
            "{} tools available. Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.",
            runner.agent().tools().len()
        ))
        .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut history = History::new();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            history.clear();
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = runner.run_with_history(&mut history, input).await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => {
                for call in &response.tool_calls {
                    let mark = if call.is_error {
                        style("✗").red()
                    } else {
                        style("✓").green()
                    };
                    println!("{} {}", style(format!("  [{}]", call.name)).dim(), mark);
                }
                println!("\n{} {}\n", style(format!("{}:", name)).cyan().bold(), response.content);
                record_generation(runtime, key, input, &response).await;
                trim_history(&mut history, MAX_HISTORY);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}

/// Drop the oldest turns. Cuts only at user messages so tool results are
/// never separated from the call that produced them.
fn trim_history(history: &mut History, max_messages: usize) {
    if history.len() <= max_messages {
        return;
    }

    let overflow = history.len() - max_messages;
    let cut = history
        .iter()
        .enumerate()
        .skip(overflow)
        .find(|(_, m)| matches!(m, ChatCompletionRequestMessage::User(_)))
        .map(|(i, _)| i)
        .unwrap_or(history.len());
    history.drain(..cut);
}
