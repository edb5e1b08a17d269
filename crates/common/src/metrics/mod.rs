//! Metrics and observability utilities
//!
//! Provides Prometheus metric descriptions, histogram buckets and recording
//! helpers with standardized naming conventions.

use crate::db::IngestionOutcome;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all DocuChat metrics
pub const METRICS_PREFIX: &str = "docuchat";

/// Buckets for store-bound request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Buckets for language model latency (typically slower)
pub const MODEL_BUCKETS: &[f64] = &[
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Ingestion metrics
    describe_counter!(
        format!("{}_articles_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Uploaded articles by upsert result (upserted, modified, matched)"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Article batch upsert latency in seconds"
    );

    // Answer metrics
    describe_counter!(
        format!("{}_answers_total", METRICS_PREFIX),
        Unit::Count,
        "Answers returned, by outcome"
    );

    // Model metrics
    describe_counter!(
        format!("{}_model_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total language model requests"
    );

    describe_histogram!(
        format!("{}_model_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Language model latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record ingestion metrics
pub fn record_ingestion(duration_secs: f64, outcome: &IngestionOutcome) {
    for (result, count) in [
        ("upserted", outcome.upserted),
        ("modified", outcome.modified),
        ("matched", outcome.matched),
    ] {
        counter!(
            format!("{}_articles_ingested_total", METRICS_PREFIX),
            "result" => result
        )
        .increment(count);
    }

    histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Helper to record an answer by outcome label
pub fn record_answer(outcome: &'static str) {
    counter!(
        format!("{}_answers_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}

/// Helper to record language model metrics
pub fn record_model_call(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_model_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_model_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}
