// ============================================
// File: crates/fleetmock-server/src/services/pipeline.rs
// ============================================
//! # Log Pipeline
//!
//! ## Creation Reason
//! Connects accepted result logs to their destination: the console in the
//! default mode, or a durable `LogSink` one table batch at a time.
//!
//! ## Main Functionality
//! - `LogPipeline::submit()`: Echo, or normalize and store
//! - `SubmitReport`: Per-table outcome of one submission
//!
//! ## ⚠️ Important Note for Next Developer
//! - There is no cross-table transaction: a failed table never undoes
//!   or blocks its siblings
//! - The endpoint ignores the report today; it is there for a stricter
//!   endpoint that wants to surface sink failures
//!
//! ## Last Modified
//! v0.1.0 - Initial pipeline implementation

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use fleetmock_core::logs::normalize;
use fleetmock_core::protocol::redact_node_key;
use fleetmock_sink::LogSink;

// ============================================
// SubmitReport
// ============================================

/// Outcome of storing one table batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOutcome {
    /// Table (collection) name.
    pub table: String,
    /// Records written, or the sink's error message.
    pub result: Result<usize, String>,
}

/// Outcome of one log submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitReport {
    /// One entry per table, in submission order. Empty in console mode.
    pub outcomes: Vec<TableOutcome>,
    /// Entries the normalizer skipped. Always 0 in console mode.
    pub skipped: usize,
    /// The submission was only echoed.
    pub console: bool,
}

impl SubmitReport {
    /// Total records written.
    #[must_use]
    pub fn stored(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .sum()
    }

    /// Tables whose batch failed.
    #[must_use]
    pub fn failed_tables(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.table.as_str())
            .collect()
    }
}

// ============================================
// LogPipeline
// ============================================

/// Normalizes result logs and hands them to the configured sink.
#[derive(Clone, Default)]
pub struct LogPipeline {
    sink: Option<Arc<dyn LogSink>>,
}

impl LogPipeline {
    /// Console mode: submissions are echoed, nothing is stored.
    #[must_use]
    pub fn console() -> Self {
        Self { sink: None }
    }

    /// Durable mode.
    #[must_use]
    pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Returns `true` when no durable sink is configured.
    #[must_use]
    pub fn is_console(&self) -> bool {
        self.sink.is_none()
    }

    /// Processes one accepted result submission.
    ///
    /// Console mode echoes the raw body and never runs the normalizer.
    pub async fn submit(&self, body: &Map<String, Value>) -> SubmitReport {
        let Some(sink) = &self.sink else {
            let pretty = serde_json::to_string_pretty(&redact_node_key(body)).unwrap_or_default();
            info!("Log: {}", pretty);
            return SubmitReport {
                outcomes: Vec::new(),
                skipped: 0,
                console: true,
            };
        };

        let batches = normalize(body);
        let skipped = batches.skipped;

        debug!(
            tables = batches.table_count(),
            records = batches.record_count(),
            sink = sink.name(),
            "Storing result log"
        );

        let mut outcomes = Vec::with_capacity(batches.table_count());
        for batch in batches {
            let result = match sink.store(&batch.table, &batch.records).await {
                Ok(written) => Ok(written),
                Err(e) => {
                    warn!(table = %batch.table, "Failed to store batch: {}", e);
                    Err(e.to_string())
                }
            };
            outcomes.push(TableOutcome {
                table: batch.table,
                result,
            });
        }

        SubmitReport {
            outcomes,
            skipped,
            console: false,
        }
    }
}

impl std::fmt::Debug for LogPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogPipeline")
            .field("sink", &self.sink.as_ref().map_or("console", |s| s.name()))
            .finish()
    }
}

// ============================================
// Tests
// ============================================
