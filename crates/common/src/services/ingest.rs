//! Article ingestion service
//!
//! Handles the upload workflow:
//! 1. Decode the uploaded JSON array
//! 2. Validate every record, rejecting the whole batch on any failure
//! 3. Upsert the batch by title

use crate::db::{Article, ArticleStore, IngestionOutcome};
use crate::errors::{AppError, RecordProblem, Result};
use crate::metrics;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use validator::{Validate, ValidationError, ValidationErrors};

/// One uploaded record, as submitted
#[derive(Debug, Deserialize, Validate)]
struct ArticleInput {
    #[validate(
        length(min = 1, message = "title must not be empty"),
        custom(function = "no_nul_chars", message = "title must not contain NUL characters")
    )]
    title: String,

    #[validate(
        length(min = 1, message = "content must not be empty"),
        custom(function = "no_nul_chars", message = "content must not contain NUL characters")
    )]
    content: String,
}

/// Postgres text cannot hold U+0000
fn no_nul_chars(value: &str) -> std::result::Result<(), ValidationError> {
    if value.contains('\0') {
        return Err(ValidationError::new("nul_char"));
    }
    Ok(())
}

/// Decode an uploaded file body into raw records.
///
/// The body must be UTF-8 JSON whose top level is an array.
pub fn parse_batch(bytes: &[u8]) -> Result<Vec<Value>> {
    let text = std::str::from_utf8(bytes).map_err(|_| AppError::InvalidFormat {
        message: "file is not valid UTF-8".to_string(),
    })?;

    let value: Value = serde_json::from_str(text).map_err(|e| AppError::InvalidFormat {
        message: format!("Invalid JSON file: {}", e),
    })?;

    match value {
        Value::Array(records) => Ok(records),
        _ => Err(AppError::InvalidFormat {
            message: "expected a JSON array of {title, content} objects".to_string(),
        }),
    }
}

/// Validate raw records into articles.
///
/// Every record is checked; if any fail, the error lists all of them.
pub fn validate_records(records: Vec<Value>) -> Result<Vec<Article>> {
    let mut articles = Vec::with_capacity(records.len());
    let mut problems = Vec::new();

    for (index, record) in records.into_iter().enumerate() {
        match decode_record(record) {
            Ok(article) => articles.push(article),
            Err(reason) => problems.push(RecordProblem { index, reason }),
        }
    }

    if !problems.is_empty() {
        return Err(AppError::InvalidRecords { problems });
    }

    Ok(articles)
}

fn decode_record(record: Value) -> std::result::Result<Article, String> {
    if !record.is_object() {
        return Err("expected an object with `title` and `content`".to_string());
    }

    let input: ArticleInput = serde_json::from_value(record).map_err(|e| e.to_string())?;
    input.validate().map_err(|e| describe(&e))?;

    Ok(Article {
        title: input.title,
        content: input.content,
    })
}

fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct IngestService {
    store: Arc<dyn ArticleStore>,
}

impl IngestService {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// Validate and upsert a batch of raw records.
    ///
    /// An empty batch returns zero counts without touching the store. Store
    /// failures propagate unchanged.
    pub async fn ingest(&self, records: Vec<Value>) -> Result<IngestionOutcome> {
        let articles = validate_records(records)?;

        if articles.is_empty() {
            tracing::debug!("Empty upload, store not contacted");
            return Ok(IngestionOutcome::default());
        }

        let start = Instant::now();

        self.store.connect().await?;
        let outcome = self.store.upsert_articles(&articles).await?;

        let duration = start.elapsed();
        metrics::record_ingestion(duration.as_secs_f64(), &outcome);

        tracing::info!(
            articles = articles.len(),
            upserted = outcome.upserted,
            modified = outcome.modified,
            matched = outcome.matched,
            total_ms = duration.as_millis() as u64,
            "Articles ingested"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailOn, FlakyStore};
    use serde_json::json;
    use tokio_test::assert_ok;

    fn records(value: Value) -> Vec<Value> {
        match value {
            Value::Array(items) => items,
            other => panic!("expected array, got {}", other),
        }
    }

    #[test]
    fn test_parse_batch_rejects_non_json() {
        let err = parse_batch(b"{not json").unwrap_err();
        assert!(matches!(err, AppError::InvalidFormat { .. }));

        let err = parse_batch(&[0xff, 0xfe, b'[', b']']).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_parse_batch_requires_array() {
        let err = parse_batch(br#"{"title": "A", "content": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("array"));

        assert_eq!(assert_ok!(parse_batch(b" [ ] ")).len(), 0);
    }

    #[test]
    fn test_validation_lists_every_offending_record() {
        let err = validate_records(records(json!([
            {"title": "Good", "content": "fine"},
            {"title": "", "content": "x"},
            {"title": "No content"},
            "just a string",
            {"title": 7, "content": "x"},
        ])))
        .unwrap_err();

        let AppError::InvalidRecords { problems } = err else {
            panic!("expected InvalidRecords");
        };
        let indexes: Vec<_> = problems.iter().map(|p| p.index).collect();
        assert_eq!(indexes, [1, 2, 3, 4]);
        assert_eq!(problems[0].reason, "title must not be empty");
        assert!(problems[1].reason.contains("missing field `content`"));
        assert!(problems[2].reason.contains("expected an object"));
    }

    #[test]
    fn test_validation_reports_both_empty_fields() {
        let err = validate_records(records(json!([{"title": "", "content": ""}]))).unwrap_err();
        let AppError::InvalidRecords { problems } = err else {
            panic!("expected InvalidRecords");
        };
        assert_eq!(
            problems[0].reason,
            "content must not be empty; title must not be empty"
        );
    }

    #[test]
    fn test_nul_characters_are_rejected() {
        let err = validate_records(records(json!([
            {"title": "Fine", "content": "ok"},
            {"title": "Nul", "content": "a\u{0}b"},
            {"title": "\u{0}", "content": "x"},
        ])))
        .unwrap_err();

        let AppError::InvalidRecords { problems } = err else {
            panic!("expected InvalidRecords");
        };
        assert_eq!(
            problems,
            vec![
                RecordProblem { index: 1, reason: "content must not contain NUL characters".into() },
                RecordProblem { index: 2, reason: "title must not contain NUL characters".into() },
            ]
        );
        assert_eq!(AppError::InvalidRecords { problems }.status_code().as_u16(), 400);
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let articles = validate_records(records(json!([
            {"title": "A", "content": "x", "author": "someone"}
        ])))
        .unwrap();
        assert_eq!(articles, vec![Article::new("A", "x")]);
    }

    #[tokio::test]
    async fn test_invalid_batch_never_reaches_store() {
        let store = Arc::new(FlakyStore::new(FailOn::Nothing, &[]).await);
        let service = IngestService::new(store.clone());

        let result = service
            .ingest(records(json!([{"title": "A", "content": "x"}, {"title": "B"}])))
            .await;

        assert!(matches!(result, Err(AppError::InvalidRecords { .. })));
        assert_eq!(store.writes(), 0);
        assert!(store.articles().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_store() {
        let store = Arc::new(FlakyStore::new(FailOn::Connect, &[]).await);
        let service = IngestService::new(store.clone());

        let outcome = service.ingest(Vec::new()).await.unwrap();

        assert_eq!(outcome, IngestionOutcome::default());
        assert_eq!(store.connects(), 0);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_titles_in_batch() {
        let store = Arc::new(FlakyStore::new(FailOn::Nothing, &[]).await);
        let service = IngestService::new(store.clone());

        let outcome = service
            .ingest(records(json!([
                {"title": "A", "content": "x"},
                {"title": "A", "content": "y"}
            ])))
            .await
            .unwrap();

        assert_eq!(outcome.upserted, 1);
        assert_eq!(store.articles().await, vec![Article::new("A", "y")]);
    }

    #[tokio::test]
    async fn test_reingest_counts() {
        let store = Arc::new(FlakyStore::new(FailOn::Nothing, &[]).await);
        let service = IngestService::new(store.clone());
        let batch = json!([{"title": "A", "content": "x"}]);

        service.ingest(records(batch.clone())).await.unwrap();
        let same = service.ingest(records(batch)).await.unwrap();
        assert_eq!(same, IngestionOutcome { upserted: 0, modified: 0, matched: 1 });

        let changed = service
            .ingest(records(json!([{"title": "A", "content": "z"}])))
            .await
            .unwrap();
        assert_eq!(changed, IngestionOutcome { upserted: 0, modified: 1, matched: 0 });
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let batch = json!([{"title": "A", "content": "x"}]);

        let down = IngestService::new(Arc::new(FlakyStore::new(FailOn::Connect, &[]).await));
        let err = down.ingest(records(batch.clone())).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseConnection { .. }));

        let full = IngestService::new(Arc::new(FlakyStore::new(FailOn::Write, &[]).await));
        let err = full.ingest(records(batch)).await.unwrap_err();
        assert!(matches!(err, AppError::StoreWrite { .. }));
    }
}
