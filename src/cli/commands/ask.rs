//! Ask command implementation.

use super::{record_generation, start_runtime};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'marquee doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.model.name = model;
    }

    let runtime = start_runtime(&settings).await?;
    let outcome = async {
        let runner = runtime.runner(&settings.agent.key)?;
        let spinner = Output::spinner("Thinking...");
        let result = runner.run(question).await;
        spinner.finish_and_clear();
        let response = result?;
        record_generation(&runtime, &settings.agent.key, question, &response).await;
        Ok::<_, crate::error::MarqueeError>(response)
    }
    .await;
    runtime.shutdown().await;

    match outcome {
        Ok(response) => {
            println!("\n{}\n", response.content);

            if !response.tool_calls.is_empty() {
                Output::header(&format!("Tool calls ({})", response.tool_calls.len()));
                for call in &response.tool_calls {
                    Output::info(&call.to_string());
                }
                println!();
            }

            Output::info(&format!("Completed in {} iteration(s)", response.iterations));
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            Err(e.into())
        }
    }
}
