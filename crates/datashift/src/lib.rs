//! # datashift
//!
//! Extension-based data migration engine.
//!
//! This library moves records between heterogeneous stores by composing
//! pluggable **extensions** behind two small contracts — a source (produces
//! records) and a sink (consumes records) — with a self-describing
//! intermediate record representation:
//!
//! - **Record model**: the [`DataItem`]/[`Value`] representation that
//!   survives translation across storage schemas
//! - **Settings metadata**: typed descriptors for every extension setting,
//!   with aggregated validation
//! - **Extension registry**: compiled-in source/sink discovery and manifests
//! - **Composable matrix**: storage components (raw bytes) × format
//!   components (bytes ⇄ records) yield concrete extensions
//! - **Run orchestrator**: sequential multi-operation transfers with
//!   cooperative cancellation
//!
//! ## Example
//!
//! ```rust,no_run
//! use datashift::{ExtensionRegistry, Orchestrator, RunConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> datashift::Result<()> {
//!     let registry = ExtensionRegistry::discover(None)?;
//!     let config = RunConfig::builder()
//!         .source("json-file")
//!         .sink("csv-file")
//!         .source_setting("FilePath", "./input.json")
//!         .sink_setting("FilePath", "./output.csv")
//!         .build();
//!     let orchestrator = Orchestrator::new(registry.into(), config);
//!     let report = orchestrator.run(CancellationToken::new()).await?;
//!     println!("Wrote {} records", report.total_records);
//!     Ok(())
//! }
//! ```

pub mod compose;
pub mod error;
pub mod extension;
pub mod format;
pub mod orchestrator;
pub mod pipeline;
pub mod record;
pub mod settings;
pub mod storage;

// Re-exports for convenient access
pub use error::{MigrateError, Result};
pub use extension::{
    DataSink, DataSource, Direction, ExtensionManifest, ExtensionRegistry, RecordStream,
};
pub use orchestrator::{
    ExtensionSelector, Orchestrator, RunConfig, RunOutcome, RunReport, RunSettings,
};
pub use pipeline::{ItemWriter, ProgressContext, WritePipeline, WritePipelineConfig, WriteStatus};
pub use record::{DataItem, TreeOptions, Value};
pub use settings::{SettingDescriptor, SettingKind, SettingsMap, ValidationError};
