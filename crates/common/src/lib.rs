//! DocuChat Common Library
//!
//! Shared code for the DocuChat gateway including:
//! - Article store models and connection management
//! - Context assembly, prompting and guard-rail filtering
//! - Language model clients
//! - Ingestion and answering services
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod context;
pub mod db;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod services;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{Article, ArticleStore, IngestionOutcome};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The exact answer returned whenever no grounded answer is available
pub const FALLBACK_ANSWER: &str = "I don't have information on that.";

/// Default language model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default upper bound on assembled context, in characters
pub const DEFAULT_CONTEXT_MAX_CHARS: usize = 12000;
