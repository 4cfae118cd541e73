//! OpenAI client configuration with sensible defaults.

use crate::error::{MarqueeError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (2 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Create an OpenAI client with the default timeout.
///
/// Reads `OPENAI_API_KEY` from the environment.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MarqueeError::OpenAI(format!("failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}
