use crate::config::AppConfig;
use crate::context::AnswerGenerator;
use crate::db::{create_store, ArticleStore};
use std::sync::Arc;

mod answer;
mod ingest;

pub use answer::{Answer, AnswerService, FallbackReason};
pub use ingest::{parse_batch, validate_records, IngestService};

// A container for all services to be injected into routes
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn ArticleStore>,
    pub ingest_service: Arc<IngestService>,
    pub answer_service: Arc<AnswerService>,
}

impl AppServices {
    pub fn new(store: Arc<dyn ArticleStore>, generator: AnswerGenerator, max_chars: usize) -> Self {
        Self {
            ingest_service: Arc::new(IngestService::new(store.clone())),
            answer_service: Arc::new(AnswerService::new(store.clone(), generator, max_chars)),
            store,
        }
    }

    /// Wire the store and model from configuration. Nothing connects here.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            create_store(&config.database),
            AnswerGenerator::from_config(&config.llm),
            config.context.max_chars,
        )
    }
}
