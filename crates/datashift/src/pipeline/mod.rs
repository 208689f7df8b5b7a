//! Batched, retried sink write pipeline.
//!
//! Network-backed sinks buffer incoming records into fixed-size batches and
//! dispatch batch members to a bounded pool of concurrent writes. Each write
//! is wrapped in a retry policy with exponential backoff that fires only on
//! transient statuses (throttling, service-unavailable, gateway timeout).
//! Batches are dispatched strictly one after another — concurrency never
//! crosses a batch boundary, so a sink's ordering assumptions hold.
//!
//! The pipeline counts successes and failures in a shared
//! [`ProgressContext`] and raises a terminal [partial-write error] when the
//! final success count falls short of the records read.
//!
//! [partial-write error]: crate::error::MigrateError::PartialWrite

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{MigrateError, Result};
use crate::extension::RecordStream;
use crate::record::DataItem;

/// Final status of one item write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatus {
    /// The item was written.
    Succeeded,
    /// The item was created.
    Created,
    /// The target reports the item does not exist. A success in delete
    /// mode, a failure otherwise.
    NotFound,
    /// The target throttled the request.
    Throttled,
    /// The target is temporarily unavailable.
    ServiceUnavailable,
    /// A gateway timed out before the target answered.
    GatewayTimeout,
    /// Permanent failure; never retried.
    Failed(String),
}

impl WriteStatus {
    /// Whether the retry policy applies to this status.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WriteStatus::Throttled | WriteStatus::ServiceUnavailable | WriteStatus::GatewayTimeout
        )
    }

    /// Whether this status counts as a completed write.
    #[must_use]
    pub fn is_success(&self, delete_mode: bool) -> bool {
        match self {
            WriteStatus::Succeeded | WriteStatus::Created => true,
            WriteStatus::NotFound => delete_mode,
            _ => false,
        }
    }
}

/// One item-granular writer backing a batching sink.
#[async_trait]
pub trait ItemWriter: Send + Sync {
    /// Attempt to write one record.
    async fn write_item(&self, item: &DataItem) -> WriteStatus;

    /// Whether writes are deletions ("not found" then counts as success).
    fn delete_mode(&self) -> bool {
        false
    }
}

/// Configuration for pipeline behavior.
#[derive(Debug, Clone)]
pub struct WritePipelineConfig {
    /// Records per batch.
    pub batch_size: usize,

    /// Maximum concurrent writes within one batch.
    pub max_concurrency: usize,

    /// Maximum retries per item on transient statuses.
    pub max_retries: usize,

    /// Base delay between retries (doubles each attempt).
    pub retry_base_delay: Duration,

    /// Log progress every this many records.
    pub progress_interval: i64,
}

impl Default for WritePipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_concurrency: 8,
            max_retries: 5,
            retry_base_delay: Duration::from_millis(100),
            progress_interval: 1000,
        }
    }
}

impl WritePipelineConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the in-batch write concurrency.
    #[must_use]
    pub fn with_max_concurrency(mut self, concurrency: usize) -> Self {
        self.max_concurrency = concurrency.max(1);
        self
    }

    /// Set the transient-failure retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base retry delay.
    #[must_use]
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Set the progress logging cadence.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: i64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }
}

/// Thread-safe per-run progress counters.
///
/// An explicit context handle threaded through the pipeline — concurrent
/// runs never share counters.
#[derive(Debug, Default)]
pub struct ProgressContext {
    records_read: AtomicI64,
    records_written: AtomicI64,
    records_failed: AtomicI64,
}

impl ProgressContext {
    /// Create a fresh context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count records read from the source.
    pub fn add_read(&self, count: i64) {
        self.records_read.fetch_add(count, Ordering::Relaxed);
    }

    /// Count records written by the sink.
    pub fn add_written(&self, count: i64) {
        self.records_written.fetch_add(count, Ordering::Relaxed);
    }

    /// Count records that permanently failed to write.
    pub fn add_failed(&self, count: i64) {
        self.records_failed.fetch_add(count, Ordering::Relaxed);
    }

    /// Records read so far.
    #[must_use]
    pub fn read(&self) -> i64 {
        self.records_read.load(Ordering::Relaxed)
    }

    /// Records written so far.
    #[must_use]
    pub fn written(&self) -> i64 {
        self.records_written.load(Ordering::Relaxed)
    }

    /// Records failed so far.
    #[must_use]
    pub fn failed(&self) -> i64 {
        self.records_failed.load(Ordering::Relaxed)
    }
}

/// Drives a record stream through an [`ItemWriter`] with batching,
/// bounded concurrency, and retry.
pub struct WritePipeline {
    writer: Arc<dyn ItemWriter>,
    config: WritePipelineConfig,
    progress: Arc<ProgressContext>,
}

impl WritePipeline {
    /// Create a pipeline over a writer.
    pub fn new(writer: Arc<dyn ItemWriter>, config: WritePipelineConfig) -> Self {
        Self {
            writer,
            config,
            progress: Arc::new(ProgressContext::new()),
        }
    }

    /// Share an existing progress context.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<ProgressContext>) -> Self {
        self.progress = progress;
        self
    }

    /// The progress context used by this pipeline.
    #[must_use]
    pub fn progress(&self) -> Arc<ProgressContext> {
        self.progress.clone()
    }

    /// Consume the stream. Returns the number of records written, or a
    /// partial-write error when any record permanently failed.
    pub async fn run(&self, mut records: RecordStream, cancel: CancellationToken) -> Result<i64> {
        let mut batch = Vec::with_capacity(self.config.batch_size);
        let mut attempted = 0i64;
        let mut succeeded = 0i64;
        let mut next_progress = self.config.progress_interval;

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => return Err(MigrateError::Cancelled),
                item = records.next() => item,
            };
            let Some(item) = item else { break };
            let item = item?;
            attempted += 1;
            batch.push(item);

            if batch.len() >= self.config.batch_size {
                succeeded += self.dispatch_batch(&mut batch, &cancel).await;
                if attempted >= next_progress {
                    info!(
                        "{} records dispatched ({} written, {} failed)",
                        attempted,
                        self.progress.written(),
                        self.progress.failed()
                    );
                    next_progress += self.config.progress_interval;
                }
            }
        }

        if !batch.is_empty() {
            succeeded += self.dispatch_batch(&mut batch, &cancel).await;
        }
        if cancel.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }

        if succeeded != attempted {
            warn!(
                "Write pipeline fell short: {} of {} records written",
                succeeded, attempted
            );
            return Err(MigrateError::PartialWrite {
                written: succeeded,
                total: attempted,
            });
        }
        debug!("Write pipeline completed: {} records", succeeded);
        Ok(succeeded)
    }

    /// Dispatch one batch with bounded concurrency. Individual failures are
    /// counted, not propagated — the terminal accounting happens in `run`.
    async fn dispatch_batch(&self, batch: &mut Vec<DataItem>, cancel: &CancellationToken) -> i64 {
        let results: Vec<bool> = stream::iter(batch.drain(..))
            .map(|item| {
                let writer = Arc::clone(&self.writer);
                let config = self.config.clone();
                let cancel = cancel.clone();
                async move { write_with_retry(writer, item, config, cancel).await }
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let written = results.iter().filter(|ok| **ok).count() as i64;
        self.progress.add_written(written);
        self.progress.add_failed(results.len() as i64 - written);
        written
    }
}

async fn write_with_retry(
    writer: Arc<dyn ItemWriter>,
    item: DataItem,
    config: WritePipelineConfig,
    cancel: CancellationToken,
) -> bool {
    let mut delay = config.retry_base_delay;
    for attempt in 0..=config.max_retries {
        if cancel.is_cancelled() {
            return false;
        }
        let status = writer.write_item(&item).await;
        if status.is_success(writer.delete_mode()) {
            return true;
        }
        if !status.is_transient() {
            warn!("Write failed permanently: {:?}", status);
            return false;
        }
        if attempt == config.max_retries {
            warn!(
                "Write failed after {} retries: {:?}",
                config.max_retries, status
            );
            return false;
        }
        debug!("Transient write failure ({:?}), retrying in {:?}", status, delay);
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = delay.saturating_mul(2);
    }
    false
}
