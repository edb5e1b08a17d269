//! Error types for DocuChat services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,
    InvalidRecords,
    PayloadTooLarge,

    // Store errors (7xxx)
    ConnectionError,
    StoreReadError,
    StoreWriteError,

    // External service errors (8xxx)
    ModelInvocationError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::InvalidRecords => 1004,
            ErrorCode::PayloadTooLarge => 1005,

            ErrorCode::ConnectionError => 7002,
            ErrorCode::StoreReadError => 7004,
            ErrorCode::StoreWriteError => 7005,

            ErrorCode::ModelInvocationError => 8001,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
        }
    }
}

/// A single rejected record in an upload batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordProblem {
    /// Zero-based position of the record in the submitted array
    pub index: usize,
    pub reason: String,
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Validation failed for {} record(s)", problems.len())]
    InvalidRecords { problems: Vec<RecordProblem> },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    // Store errors
    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Store read error: {message}")]
    StoreRead { message: String },

    #[error("Store write error: {message}")]
    StoreWrite { message: String },

    // External service errors
    #[error("Language model error: {message}")]
    ModelInvocation { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidRecords { .. } => ErrorCode::InvalidRecords,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::StoreRead { .. } => ErrorCode::StoreReadError,
            AppError::StoreWrite { .. } => ErrorCode::StoreWriteError,
            AppError::ModelInvocation { .. } => ErrorCode::ModelInvocationError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::InvalidRecords { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 500 Internal Server Error
            AppError::DatabaseConnection { .. }
            | AppError::StoreRead { .. }
            | AppError::StoreWrite { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::ModelInvocation { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Structured details attached to the response body, if any
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::InvalidRecords { problems } => serde_json::to_value(problems).ok(),
            AppError::Validation {
                field: Some(field), ..
            } => Some(serde_json::json!({ "field": field })),
            _ => None,
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "question must not be empty".into(),
            field: Some("question".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_invalid_records_details() {
        let err = AppError::InvalidRecords {
            problems: vec![
                RecordProblem { index: 0, reason: "title must not be empty".into() },
                RecordProblem { index: 3, reason: "missing field `content`".into() },
            ],
        };
        assert_eq!(err.to_string(), "Validation failed for 2 record(s)");
        assert_eq!(err.code(), ErrorCode::InvalidRecords);

        let details = err.details().unwrap();
        assert_eq!(details[1]["index"], 3);
        assert_eq!(details[0]["reason"], "title must not be empty");
    }

    #[test]
    fn test_store_errors_are_server_errors() {
        for err in [
            AppError::DatabaseConnection { message: "refused".into() },
            AppError::StoreWrite { message: "constraint".into() },
            AppError::Configuration { message: "database.uri is not set".into() },
        ] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(err.is_server_error());
        }
    }

    #[test]
    fn test_oversized_upload_is_client_error() {
        let err = AppError::PayloadTooLarge { message: "limit is 64 bytes".into() };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.code().as_code(), 1005);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_model_error_maps_to_bad_gateway() {
        let err = AppError::ModelInvocation { message: "timeout".into() };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code().as_code(), 8001);
    }
}
