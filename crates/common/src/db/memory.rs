//! In-process article store for tests and local development

use crate::db::models::{Article, IngestionOutcome};
use crate::db::{ArticleStore, StoreHealth};
use crate::errors::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    articles: Vec<Article>,
    by_title: HashMap<String, usize>,
}

/// Article store kept in memory, with the same upsert counting as Postgres
#[derive(Default)]
pub struct MemoryArticleStore {
    inner: RwLock<Inner>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `articles`, as if uploaded in one batch
    #[cfg(test)]
    pub async fn with_articles(articles: &[Article]) -> Self {
        let store = Self::new();
        store
            .upsert_articles(articles)
            .await
            .expect("in-memory upsert");
        store
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.articles.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert_articles(&self, articles: &[Article]) -> Result<IngestionOutcome> {
        let mut outcome = IngestionOutcome::default();
        let mut inner = self.inner.write().await;

        for article in articles {
            match inner.by_title.get(&article.title).copied() {
                Some(idx) if inner.articles[idx].content == article.content => {
                    outcome.matched += 1;
                }
                Some(idx) => {
                    inner.articles[idx].content = article.content.clone();
                    outcome.modified += 1;
                }
                None => {
                    let idx = inner.articles.len();
                    inner.articles.push(article.clone());
                    inner.by_title.insert(article.title.clone(), idx);
                    outcome.upserted += 1;
                }
            }
        }

        Ok(outcome)
    }

    async fn fetch_all_articles(&self) -> Result<Vec<Article>> {
        Ok(self.inner.read().await.articles.clone())
    }

    async fn health(&self) -> StoreHealth {
        StoreHealth::Up
    }

    async fn disconnect(&self) {}
}
