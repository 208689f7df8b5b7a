//! Run orchestrator - resolves configuration, selects extensions, and
//! drives the streaming transfers.
//!
//! A run executes its operations sequentially, in declared order; one
//! source→sink transfer is in flight at a time so resource usage and log
//! ordering stay predictable. On the first failed operation the remaining
//! ones are aborted — later operations may share configuration assumptions
//! with the one that failed.

mod config;

pub use config::{
    parse_setting_override, ConfigOverrides, OperationConfig, OperationSettings, RunConfig,
    RunConfigBuilder, RunSettings, DEFAULT_SETTINGS_FILE, SINK_ENV, SOURCE_ENV,
};

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{MigrateError, Result};
use crate::extension::{DataSink, DataSource, Direction, ExtensionRegistry};
use crate::pipeline::ProgressContext;
use crate::settings::{mask_sensitive, SettingDescriptor, SettingsMap, ValidationError};

/// Final outcome of a run or a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Result of one operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    /// Zero-based position in the declared operation order.
    pub index: usize,

    /// Source extension display name.
    pub source: String,

    /// Sink extension display name.
    pub sink: String,

    /// Records produced by the source.
    pub records_read: i64,

    /// Records written by the sink.
    pub records_written: i64,

    /// Operation outcome.
    pub outcome: RunOutcome,

    /// Failure detail, absent for completed and cancelled operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock duration in seconds.
    pub duration_seconds: f64,
}

/// Result of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Overall outcome (worst of the operations).
    pub outcome: RunOutcome,

    /// Total records written across operations.
    pub total_records: i64,

    /// Wall-clock duration in seconds.
    pub duration_seconds: f64,

    /// Per-operation results, in execution order.
    pub operations: Vec<OperationReport>,
}

impl RunReport {
    /// Serialize the report as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Interactive fallback for extension selection.
///
/// CLI contexts provide a numbered-list prompt; headless contexts provide
/// none and unresolvable selections become configuration errors. The
/// implementation must honor the cancellation token immediately rather
/// than waiting for input.
#[async_trait]
pub trait ExtensionSelector: Send + Sync {
    /// Pick one name out of the loaded extensions for a direction.
    async fn pick(
        &self,
        direction: Direction,
        names: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<String>;
}

/// Coordinates one run: extension selection, validation, streaming.
pub struct Orchestrator {
    registry: Arc<ExtensionRegistry>,
    config: RunConfig,
    selector: Option<Arc<dyn ExtensionSelector>>,
}

impl Orchestrator {
    /// Create an orchestrator over a loaded registry and resolved config.
    pub fn new(registry: Arc<ExtensionRegistry>, config: RunConfig) -> Self {
        Self {
            registry,
            config,
            selector: None,
        }
    }

    /// Attach an interactive selection fallback.
    #[must_use]
    pub fn with_selector(mut self, selector: Arc<dyn ExtensionSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Execute the run.
    ///
    /// Selection, configuration, and validation problems return an error
    /// before any I/O. Failures during streaming are captured in the
    /// report with outcome [`RunOutcome::Failed`]; remaining operations
    /// are aborted.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport> {
        let started = Instant::now();

        // Selection happens once; per-operation overrides must name a
        // loaded extension explicitly.
        let default_source = if self.config.operations.iter().any(|op| op.source.is_none()) {
            Some(self.resolve_source(&cancel).await?)
        } else {
            None
        };
        let default_sink = if self.config.operations.iter().any(|op| op.sink.is_none()) {
            Some(self.resolve_sink(&cancel).await?)
        } else {
            None
        };

        let total_operations = self.config.operations.len();
        let mut operations = Vec::with_capacity(total_operations);
        let mut outcome = RunOutcome::Completed;
        let mut total_records = 0i64;

        for (index, op) in self.config.operations.iter().enumerate() {
            if cancel.is_cancelled() {
                outcome = RunOutcome::Cancelled;
                break;
            }

            let source = match &op.source {
                Some(name) => self.registry.find_source(name).ok_or_else(|| {
                    MigrateError::Config(format!("No source extension matches '{}'", name))
                })?,
                None => default_source.clone().ok_or_else(|| {
                    MigrateError::Config("No source extension selected".to_string())
                })?,
            };
            let sink = match &op.sink {
                Some(name) => self.registry.find_sink(name).ok_or_else(|| {
                    MigrateError::Config(format!("No sink extension matches '{}'", name))
                })?,
                None => default_sink.clone().ok_or_else(|| {
                    MigrateError::Config("No sink extension selected".to_string())
                })?,
            };

            info!(
                "Operation {}/{}: {} -> {}",
                index + 1,
                total_operations,
                source.name(),
                sink.name()
            );
            let op_started = Instant::now();

            match self
                .execute(index, source.as_ref(), sink.as_ref(), op, &cancel)
                .await
            {
                Ok((read, written)) => {
                    info!(
                        "Operation {} completed: {} records read, {} written",
                        index, read, written
                    );
                    total_records += written;
                    operations.push(OperationReport {
                        index,
                        source: source.name().to_string(),
                        sink: sink.name().to_string(),
                        records_read: read,
                        records_written: written,
                        outcome: RunOutcome::Completed,
                        error: None,
                        duration_seconds: op_started.elapsed().as_secs_f64(),
                    });
                }
                Err(MigrateError::Cancelled) => {
                    // Cancellation is not a failure; nothing is logged as
                    // an error.
                    info!("Operation {} cancelled", index);
                    outcome = RunOutcome::Cancelled;
                    operations.push(OperationReport {
                        index,
                        source: source.name().to_string(),
                        sink: sink.name().to_string(),
                        records_read: 0,
                        records_written: 0,
                        outcome: RunOutcome::Cancelled,
                        error: None,
                        duration_seconds: op_started.elapsed().as_secs_f64(),
                    });
                    break;
                }
                Err(err @ MigrateError::Validation(_)) => {
                    // Aborts before any I/O; never partially applied.
                    return Err(err);
                }
                Err(err) => {
                    error!(
                        "Operation {} ({} -> {}) failed: {}",
                        index,
                        source.name(),
                        sink.name(),
                        err
                    );
                    outcome = RunOutcome::Failed;
                    operations.push(OperationReport {
                        index,
                        source: source.name().to_string(),
                        sink: sink.name().to_string(),
                        records_read: 0,
                        records_written: 0,
                        outcome: RunOutcome::Failed,
                        error: Some(err.to_string()),
                        duration_seconds: op_started.elapsed().as_secs_f64(),
                    });
                    let remaining = total_operations - index - 1;
                    if remaining > 0 {
                        warn!("Aborting {} remaining operation(s)", remaining);
                    }
                    break;
                }
            }
        }

        Ok(RunReport {
            outcome,
            total_records,
            duration_seconds: started.elapsed().as_secs_f64(),
            operations,
        })
    }

    /// Validate then stream one operation. No I/O happens before both
    /// sides' settings pass validation.
    async fn execute(
        &self,
        index: usize,
        source: &dyn DataSource,
        sink: &dyn DataSink,
        op: &OperationConfig,
        cancel: &CancellationToken,
    ) -> Result<(i64, i64)> {
        let mut errors: Vec<ValidationError> = source
            .validate(&op.source_settings)
            .iter()
            .map(|e| e.prefixed("Source"))
            .collect();
        errors.extend(
            sink.validate(&op.sink_settings)
                .iter()
                .map(|e| e.prefixed("Sink")),
        );
        if !errors.is_empty() {
            return Err(MigrateError::Validation(errors));
        }

        log_settings("source", &source.settings(), &op.source_settings);
        log_settings("sink", &sink.settings(), &op.sink_settings);

        let progress = Arc::new(ProgressContext::new());

        let records = source
            .read(&op.source_settings, cancel.clone())
            .await
            .map_err(|e| wrap_extension_error(source.name(), index, e))?;

        let counted = {
            let progress = progress.clone();
            records
                .inspect(move |record| {
                    if record.is_ok() {
                        progress.add_read(1);
                    }
                })
                .boxed()
        };

        let written = sink
            .write(counted, &op.sink_settings, source.name(), cancel.clone())
            .await
            .map_err(|e| wrap_extension_error(sink.name(), index, e))?;

        Ok((progress.read(), written))
    }

    async fn resolve_source(&self, cancel: &CancellationToken) -> Result<Arc<dyn DataSource>> {
        if let Some(name) = &self.config.source {
            if let Some(source) = self.registry.find_source(name) {
                return Ok(source);
            }
            warn!("No source extension matches '{}'", name);
        }
        if let Some(selector) = &self.selector {
            let names: Vec<String> = self
                .registry
                .sources()
                .iter()
                .map(|s| s.name().to_string())
                .collect();
            let picked = selector.pick(Direction::Source, names, cancel).await?;
            return self.registry.find_source(&picked).ok_or_else(|| {
                MigrateError::Config(format!("No source extension matches '{}'", picked))
            });
        }
        Err(match &self.config.source {
            Some(name) => {
                MigrateError::Config(format!("No source extension matches '{}'", name))
            }
            None => MigrateError::Config("No source extension selected".to_string()),
        })
    }

    async fn resolve_sink(&self, cancel: &CancellationToken) -> Result<Arc<dyn DataSink>> {
        if let Some(name) = &self.config.sink {
            if let Some(sink) = self.registry.find_sink(name) {
                return Ok(sink);
            }
            warn!("No sink extension matches '{}'", name);
        }
        if let Some(selector) = &self.selector {
            let names: Vec<String> = self
                .registry
                .sinks()
                .iter()
                .map(|s| s.name().to_string())
                .collect();
            let picked = selector.pick(Direction::Sink, names, cancel).await?;
            return self.registry.find_sink(&picked).ok_or_else(|| {
                MigrateError::Config(format!("No sink extension matches '{}'", picked))
            });
        }
        Err(match &self.config.sink {
            Some(name) => MigrateError::Config(format!("No sink extension matches '{}'", name)),
            None => MigrateError::Config("No sink extension selected".to_string()),
        })
    }
}

/// Sensitive settings are masked before they reach the log.
fn log_settings(side: &str, descriptors: &[SettingDescriptor], values: &SettingsMap) {
    for descriptor in descriptors {
        if let Some(value) = values.get(&descriptor.name) {
            debug!(
                "Resolved {} setting {} = {}",
                side,
                descriptor.name,
                mask_sensitive(descriptor, value)
            );
        }
    }
}

/// Unexpected extension errors get operation context at this boundary;
/// cancellation and partial-write outcomes pass through untouched so their
/// classes survive to reporting.
fn wrap_extension_error(name: &str, operation: usize, err: MigrateError) -> MigrateError {
    match err {
        MigrateError::Cancelled => MigrateError::Cancelled,
        partial @ MigrateError::PartialWrite { .. } => partial,
        other => MigrateError::extension(name, operation, other.to_string()),
    }
}
