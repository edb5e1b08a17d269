//! Chat handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::instrument;
use validator::Validate;

use crate::AppState;
use docuchat_common::errors::{AppError, Result};

/// Chat request
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1))]
    pub question: String,
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

/// Answer a question from the uploaded articles
///
/// POST /chat
#[instrument(skip_all)]
pub async fn chat(
    State(state): State<AppState>,
    request: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let start = Instant::now();

    let Json(request) = request.map_err(|e| AppError::InvalidFormat {
        message: e.body_text(),
    })?;

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("question".to_string()),
    })?;

    let answer = state
        .services
        .answer_service
        .answer(&request.question)
        .await?;

    tracing::info!(
        outcome = answer.label(),
        processing_time_ms = start.elapsed().as_millis() as u64,
        "Chat completed"
    );

    Ok(Json(ChatResponse {
        answer: answer.into_text(),
    }))
}
