//! Document store layer for DocuChat
//!
//! Provides:
//! - SeaORM entity models
//! - The `ArticleStore` seam used by both pipelines
//! - Lazy, once-only connection management
//! - Postgres and in-memory store implementations

pub mod models;
mod memory;
mod repository;

pub use memory::MemoryArticleStore;
pub use models::{Article, IngestionOutcome};
pub use repository::PgArticleStore;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoffBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Storage operations over the article collection
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Open the backing connection if needed. Idempotent.
    async fn connect(&self) -> Result<()>;

    /// Insert-or-update each record by title, in order
    async fn upsert_articles(&self, articles: &[Article]) -> Result<IngestionOutcome>;

    /// Every stored article, in insertion order
    async fn fetch_all_articles(&self) -> Result<Vec<Article>>;

    /// Connectivity as seen by readiness probes. Never opens a connection.
    async fn health(&self) -> StoreHealth;

    /// Release the backing connection. Safe when not connected.
    async fn disconnect(&self);
}

/// Readiness of the backing store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreHealth {
    Up,
    /// No request has needed the store yet
    NotConnected,
    Down(String),
}

/// Create an article store based on configuration
pub fn create_store(config: &DatabaseConfig) -> Arc<dyn ArticleStore> {
    match config.backend {
        StoreBackend::Postgres => {
            Arc::new(PgArticleStore::new(Arc::new(ConnectionManager::new(config.clone()))))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory article store; uploads are lost on restart");
            Arc::new(MemoryArticleStore::new())
        }
    }
}

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS articles (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_TITLE_INDEX_SQL: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS articles_title_key ON articles (title)";

/// Owns the single process-wide store connection.
///
/// The pool is opened on the first `connect()` and shared afterwards. Only
/// one connection attempt runs at a time, so the pool and the schema are
/// initialised exactly once. Callers that queued behind a failed attempt get
/// its error without trying again, and for `connect_retry` after a failure
/// every caller fails fast.
pub struct ConnectionManager {
    config: DatabaseConfig,
    handle: RwLock<Option<DatabaseConnection>>,
    attempt: Mutex<Option<ConnectFailure>>,
    failures: AtomicU64,
}

/// Outcome of the most recent failed connection attempt
struct ConnectFailure {
    at: Instant,
    message: String,
}

impl ConnectionManager {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            handle: RwLock::new(None),
            attempt: Mutex::new(None),
            failures: AtomicU64::new(0),
        }
    }

    /// Return the open connection, opening it and ensuring the schema first if needed
    pub async fn connect(&self) -> Result<DatabaseConnection> {
        if let Some(conn) = self.handle.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let url = self.config.connection_url()?;

        let seen = self.failures.load(Ordering::Acquire);
        let mut last_failure = self.attempt.lock().await;

        if let Some(conn) = self.handle.read().await.as_ref() {
            return Ok(conn.clone());
        }

        if let Some(failure) = last_failure.as_ref() {
            let failed_while_waiting = self.failures.load(Ordering::Acquire) != seen;
            if failed_while_waiting || failure.at.elapsed() < self.config.connect_retry() {
                return Err(AppError::DatabaseConnection {
                    message: failure.message.clone(),
                });
            }
        }

        info!("Connecting to article store...");
        let opened = match self.open(url).await {
            Ok(conn) => ensure_schema(&conn).await.map(|()| conn),
            Err(e) => Err(e),
        };

        match opened {
            Ok(conn) => {
                *self.handle.write().await = Some(conn.clone());
                *last_failure = None;
                info!("Article store connection established");
                Ok(conn)
            }
            Err(e) => {
                *last_failure = Some(ConnectFailure {
                    at: Instant::now(),
                    message: e.to_string(),
                });
                self.failures.fetch_add(1, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Return the open connection without attempting to connect
    pub async fn get_or_fail(&self) -> Result<DatabaseConnection> {
        self.handle
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::DatabaseConnection {
                message: "article store is not connected".to_string(),
            })
    }

    /// Whether a pool is open. Never waits on a running attempt.
    pub fn is_connected(&self) -> bool {
        self.handle
            .try_read()
            .map(|handle| handle.is_some())
            .unwrap_or(false)
    }

    /// Ping the store to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.get_or_fail()
            .await?
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }

    /// Close the pool if one is open
    pub async fn disconnect(&self) {
        let conn = self.handle.write().await.take();

        if let Some(conn) = conn {
            match conn.close().await {
                Ok(()) => info!("Article store connection closed"),
                Err(e) => warn!(error = %e, "Error while closing article store connection"),
            }
        }
    }

    async fn open(&self, url: String) -> Result<DatabaseConnection> {
        let limit = self.config.attempt_timeout();

        let mut opts = ConnectOptions::new(url);
        opts.max_connections(self.config.max_connections)
            .min_connections(self.config.min_connections)
            .connect_timeout(limit)
            .acquire_timeout(limit)
            .idle_timeout(self.config.idle_timeout())
            .sqlx_logging(false);

        let policy = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(limit))
            .build();

        let attempt = retry(policy, || {
            let opts = opts.clone();
            async move {
                Database::connect(opts).await.map_err(|e| {
                    warn!(error = %e, "Article store connection attempt failed");
                    backoff::Error::transient(e)
                })
            }
        });

        match tokio::time::timeout(limit, attempt).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(AppError::DatabaseConnection {
                message: format!("Failed to connect to article store: {}", e),
            }),
            Err(_) => Err(AppError::DatabaseConnection {
                message: format!(
                    "Failed to connect to article store: timed out after {}s",
                    limit.as_secs()
                ),
            }),
        }
    }
}

async fn ensure_schema(conn: &DatabaseConnection) -> Result<()> {
    for sql in [CREATE_TABLE_SQL, CREATE_TITLE_INDEX_SQL] {
        conn.execute_unprepared(sql)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to prepare articles schema: {}", e),
            })?;
    }

    Ok(())
}
