//! Language model abstraction
//!
//! Provides a unified interface for hosted text-generation providers:
//! - Google Gemini (`generateContent`)
//! - OpenAI-compatible chat completions

mod gemini;
mod openai;

pub use gemini::GeminiModel;
pub use openai::OpenAiCompatibleModel;

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for single-prompt text generation
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for `prompt`. May return an empty string.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

pub(crate) fn build_http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(|e| AppError::Internal {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Create a language model based on configuration
///
/// Fails with a configuration error when the API key is missing or the
/// provider is unknown.
pub fn create_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>> {
    let api_key = config.api_key().ok_or_else(|| AppError::Configuration {
        message: "llm.api_key is not set".to_string(),
    })?;

    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiModel::new(api_key.to_string(), config)?)),
        "openai" => Ok(Arc::new(OpenAiCompatibleModel::new(api_key.to_string(), config)?)),
        other => Err(AppError::Configuration {
            message: format!("unknown llm.provider '{}'", other),
        }),
    }
}
