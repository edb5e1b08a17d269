//! Article upload handler

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::instrument;

use crate::AppState;
use docuchat_common::{
    errors::{AppError, Result},
    services::parse_batch,
    IngestionOutcome,
};

/// Name of the multipart field carrying the JSON file
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub upserted: u64,
    pub modified: u64,
    pub matched: u64,
}

impl From<IngestionOutcome> for UploadResponse {
    fn from(outcome: IngestionOutcome) -> Self {
        Self {
            upserted: outcome.upserted,
            modified: outcome.modified,
            matched: outcome.matched,
        }
    }
}

/// Upload a JSON array of articles
///
/// POST /upload (multipart, field `file`, `*.json`)
#[instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|e| {
        multipart_error(e.status(), format!("Expected a multipart form: {}", e.body_text()))
    })?;

    let bytes = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| {
                multipart_error(e.status(), format!("Malformed multipart body: {}", e.body_text()))
            })?
            .ok_or_else(|| AppError::MissingField {
                field: FILE_FIELD.to_string(),
            })?;

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !filename.to_ascii_lowercase().ends_with(".json") {
            return Err(AppError::InvalidFormat {
                message: "Only .json files are supported".to_string(),
            });
        }

        break field.bytes().await.map_err(|e| {
            multipart_error(e.status(), format!("Failed to read uploaded file: {}", e.body_text()))
        })?;
    };

    let records = parse_batch(&bytes)?;
    tracing::debug!(records = records.len(), "Upload parsed");

    let outcome = state.services.ingest_service.ingest(records).await?;

    Ok(Json(outcome.into()))
}

/// Keep the body limit's 413; every other multipart failure is a bad request
fn multipart_error(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { message }
    } else {
        AppError::InvalidFormat { message }
    }
}
