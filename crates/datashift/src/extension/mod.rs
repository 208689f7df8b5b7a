//! Extension contracts and the compiled-in registry.
//!
//! This module defines the two capability traits every extension implements
//! one of:
//!
//! - [`DataSource`]: produces a lazy stream of records
//! - [`DataSink`]: consumes a stream of records
//!
//! Extensions declare a display name, optional aliases, and their settings
//! schema; the [`ExtensionRegistry`] resolves them by name and builds the
//! introspection [`ExtensionManifest`] without executing them.

mod manifest;
mod registry;

pub use manifest::{ExtensionEntry, ExtensionManifest};
pub use registry::{ExtensionRegistry, EXTENSIONS_DIR_ENV};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::record::DataItem;
use crate::settings::{validate_settings, SettingDescriptor, SettingsMap, ValidationError};

/// A lazy, pull-driven stream of records. The sink asks for the next item;
/// nothing is buffered by the core.
pub type RecordStream = BoxStream<'static, Result<DataItem>>;

/// Whether an extension produces or consumes records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Source,
    Sink,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Source => write!(f, "source"),
            Direction::Sink => write!(f, "sink"),
        }
    }
}

/// Produce a stream of records from a backing store.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Display name used for selection and logging.
    fn name(&self) -> &str;

    /// Alternative names accepted during selection.
    fn aliases(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Extension version reported in the manifest.
    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    /// The settings schema for this extension.
    fn settings(&self) -> Vec<SettingDescriptor> {
        Vec::new()
    }

    /// Validate a settings object. The default checks the declared
    /// descriptors; extensions override to add cross-field rules, returning
    /// every violation.
    fn validate(&self, settings: &SettingsMap) -> Vec<ValidationError> {
        validate_settings(&self.settings(), settings)
    }

    /// Start reading records. The returned stream owns everything it needs;
    /// it is handed directly to the sink.
    async fn read(&self, settings: &SettingsMap, cancel: CancellationToken)
        -> Result<RecordStream>;
}

/// Consume a stream of records into a backing store.
#[async_trait]
pub trait DataSink: Send + Sync {
    /// Display name used for selection and logging.
    fn name(&self) -> &str;

    /// Alternative names accepted during selection.
    fn aliases(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Extension version reported in the manifest.
    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    /// The settings schema for this extension.
    fn settings(&self) -> Vec<SettingDescriptor> {
        Vec::new()
    }

    /// Validate a settings object (see [`DataSource::validate`]).
    fn validate(&self, settings: &SettingsMap) -> Vec<ValidationError> {
        validate_settings(&self.settings(), settings)
    }

    /// Consume the record stream, returning the number of records written.
    ///
    /// `source_name` identifies the producing extension — some sinks use it
    /// for provenance, e.g. to name an output file after the source.
    async fn write(
        &self,
        records: RecordStream,
        settings: &SettingsMap,
        source_name: &str,
        cancel: CancellationToken,
    ) -> Result<i64>;
}
