//! Postgres-backed article store
//!
//! Upserts are conditional writes keyed on the unique `title` index; reads
//! return rows in insertion order so context assembly is stable.

use crate::db::models::{Article, ArticleColumn, ArticleEntity, IngestionOutcome};
use crate::db::{ArticleStore, ConnectionManager, StoreHealth};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, DbBackend, DbErr, EntityTrait, QueryOrder, QuerySelect, Statement,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::debug;

/// Insert a new title, or overwrite content only when it differs.
///
/// Returns no row when the title exists with identical content; otherwise
/// `inserted` is true for a fresh row (`xmax = 0`) and false for an update.
const UPSERT_SQL: &str = r#"
    INSERT INTO articles (title, content)
    VALUES ($1, $2)
    ON CONFLICT (title) DO UPDATE
        SET content = EXCLUDED.content, updated_at = NOW()
        WHERE articles.content IS DISTINCT FROM EXCLUDED.content
    RETURNING (xmax = 0) AS inserted
"#;

fn write_error(e: DbErr) -> AppError {
    AppError::StoreWrite { message: e.to_string() }
}

/// Article store over a shared [`ConnectionManager`]
#[derive(Clone)]
pub struct PgArticleStore {
    manager: Arc<ConnectionManager>,
}

impl PgArticleStore {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn connect(&self) -> Result<()> {
        self.manager.connect().await.map(|_| ())
    }

    async fn upsert_articles(&self, articles: &[Article]) -> Result<IngestionOutcome> {
        let mut outcome = IngestionOutcome::default();
        if articles.is_empty() {
            return Ok(outcome);
        }

        let conn = self.manager.get_or_fail().await?;

        // One statement per record: a single multi-row upsert cannot touch the
        // same title twice, and batches may repeat titles.
        let txn = conn.begin().await.map_err(write_error)?;

        for article in articles {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                UPSERT_SQL,
                [article.title.as_str().into(), article.content.as_str().into()],
            );

            match txn.query_one(stmt).await.map_err(write_error)? {
                None => outcome.matched += 1,
                Some(row) => {
                    let inserted: bool = row.try_get("", "inserted").map_err(write_error)?;
                    if inserted {
                        outcome.upserted += 1;
                    } else {
                        outcome.modified += 1;
                    }
                }
            }
        }

        txn.commit().await.map_err(write_error)?;

        debug!(
            upserted = outcome.upserted,
            modified = outcome.modified,
            matched = outcome.matched,
            "Article batch written"
        );

        Ok(outcome)
    }

    async fn fetch_all_articles(&self) -> Result<Vec<Article>> {
        let conn = self.manager.get_or_fail().await?;

        ArticleEntity::find()
            .select_only()
            .column(ArticleColumn::Title)
            .column(ArticleColumn::Content)
            .order_by_asc(ArticleColumn::Id)
            .into_model::<Article>()
            .all(&conn)
            .await
            .map_err(|e| AppError::StoreRead { message: e.to_string() })
    }

    async fn health(&self) -> StoreHealth {
        if !self.manager.is_connected() {
            return StoreHealth::NotConnected;
        }

        match self.manager.ping().await {
            Ok(()) => StoreHealth::Up,
            Err(e) => StoreHealth::Down(e.to_string()),
        }
    }

    async fn disconnect(&self) {
        self.manager.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn store(config: DatabaseConfig) -> PgArticleStore {
        PgArticleStore::new(Arc::new(ConnectionManager::new(config)))
    }

    /// Postgres from `APP__DATABASE__URI` / `APP__DATABASE__NAME`, if set
    fn live_config() -> Option<DatabaseConfig> {
        let uri = std::env::var("APP__DATABASE__URI").ok()?;
        let name = std::env::var("APP__DATABASE__NAME").unwrap_or_else(|_| "postgres".to_string());
        Some(DatabaseConfig {
            uri: Some(uri),
            name: Some(name),
            ..DatabaseConfig::default()
        })
    }

    #[tokio::test]
    async fn test_operations_before_connect() {
        let store = store(DatabaseConfig::default());

        assert_eq!(store.health().await, StoreHealth::NotConnected);
        assert!(matches!(
            store.fetch_all_articles().await,
            Err(AppError::DatabaseConnection { .. })
        ));
        assert!(matches!(
            store.upsert_articles(&[Article::new("A", "x")]).await,
            Err(AppError::DatabaseConnection { .. })
        ));

        // Empty batches never need the connection
        assert_eq!(store.upsert_articles(&[]).await.unwrap(), IngestionOutcome::default());
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL at APP__DATABASE__URI"]
    async fn test_upsert_counts_against_postgres() {
        let Some(config) = live_config() else {
            return;
        };
        let store = store(config);
        store.connect().await.unwrap();
        assert_eq!(store.health().await, StoreHealth::Up);

        let run = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let a = format!("A-{}", run);
        let b = format!("B-{}", run);

        let first = store
            .upsert_articles(&[
                Article::new(&a, "x"),
                Article::new(&a, "y"),
                Article::new(&b, "z"),
            ])
            .await
            .unwrap();
        assert_eq!(first, IngestionOutcome { upserted: 2, modified: 1, matched: 0 });

        let same = store.upsert_articles(&[Article::new(&a, "y")]).await.unwrap();
        assert_eq!(same, IngestionOutcome { upserted: 0, modified: 0, matched: 1 });

        let changed = store.upsert_articles(&[Article::new(&a, "w")]).await.unwrap();
        assert_eq!(changed, IngestionOutcome { upserted: 0, modified: 1, matched: 0 });

        let ours: Vec<_> = store
            .fetch_all_articles()
            .await
            .unwrap()
            .into_iter()
            .filter(|article| article.title == a || article.title == b)
            .collect();
        assert_eq!(ours, vec![Article::new(&a, "w"), Article::new(&b, "z")]);

        store.disconnect().await;
        assert_eq!(store.health().await, StoreHealth::NotConnected);
    }
}
