//! SeaORM entity models and the article types shared by both pipelines

mod article;

use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

pub use article::{
    Entity as ArticleEntity,
    Column as ArticleColumn,
};

/// A titled text article. `title` is the identity across the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromQueryResult)]
pub struct Article {
    pub title: String,
    pub content: String,
}

impl Article {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Per-batch upsert counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionOutcome {
    /// Records inserted under a new title
    pub upserted: u64,
    /// Records that matched an existing title and changed its content
    pub modified: u64,
    /// Records that matched an existing title with identical content
    pub matched: u64,
}

impl IngestionOutcome {
    pub fn total(&self) -> u64 {
        self.upserted + self.modified + self.matched
    }
}
