//! Answer generator - prompts the language model with the assembled context

use crate::config::LlmConfig;
use crate::context::guardrail::apply_guard_rail;
use crate::errors::{AppError, Result};
use crate::llm::{create_model, LanguageModel};
use crate::metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fixed instruction placed ahead of the context in every prompt
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. Answer ONLY using the \
    provided context. If the question cannot be answered from the context, reply exactly: \
    'I don't have information on that.'";

/// Build the single prompt: instruction, then context, then question
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "{}\n\nContext (articles):\n{}\n\nQuestion: {}\n",
        SYSTEM_INSTRUCTION, context, question
    )
}

/// Generates context-grounded answers
#[derive(Clone)]
pub struct AnswerGenerator {
    /// The model, or why none is available
    model: std::result::Result<Arc<dyn LanguageModel>, String>,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model: Ok(model) }
    }

    /// Build from configuration. A missing key leaves the generator
    /// unavailable; every call then fails with a configuration error.
    pub fn from_config(config: &LlmConfig) -> Self {
        match create_model(config) {
            Ok(model) => {
                info!(provider = %config.provider, model = %model.model_name(), "Language model configured");
                Self::new(model)
            }
            Err(e) => {
                warn!(error = %e, "Answer generation unavailable");
                Self { model: Err(e.to_string()) }
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_ok()
    }

    /// Ask the model `question` against `context`.
    ///
    /// The model call runs on its own task. The trimmed reply is passed
    /// through the guard-rail, so a blank or out-of-context reply comes back
    /// as the fallback answer.
    pub async fn generate_answer(&self, context: &str, question: &str) -> Result<String> {
        let model = self
            .model
            .clone()
            .map_err(|message| AppError::Configuration { message })?;

        let prompt = build_prompt(context, question);
        let model_name = model.model_name().to_string();

        debug!(model = %model_name, prompt_chars = prompt.len(), "Invoking language model");

        let start = Instant::now();
        let result = tokio::spawn(async move { model.generate(&prompt).await })
            .await
            .map_err(|e| AppError::ModelInvocation {
                message: format!("Model task failed: {}", e),
            })
            .and_then(|reply| reply);

        let elapsed = start.elapsed();
        metrics::record_model_call(elapsed.as_secs_f64(), &model_name, result.is_ok());

        let raw = result?;
        debug!(model = %model_name, latency_ms = elapsed.as_millis() as u64, "Model replied");

        Ok(apply_guard_rail(raw.trim()))
    }
}
