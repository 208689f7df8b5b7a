//! The composable extension matrix.
//!
//! A *storage* component knows only how to obtain or place byte streams; a
//! *format* component knows only how to translate bytes ⇄ records. A
//! composite extension is the product of exactly one of each, exposing the
//! ordinary source/sink contract by delegation — N storages × M formats
//! yield N×M named extensions from N+M implementations.
//!
//! A composite's settings schema is the union of its storage's and its
//! format's settings, deduplicated by property name.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::extension::{DataSink, DataSource, RecordStream};
use crate::settings::{SettingDescriptor, SettingsMap};

/// An opened byte stream produced by a storage component.
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// A byte stream being written through a storage component.
pub type ByteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Obtain byte streams from a backing store. Knows nothing about records.
#[async_trait]
pub trait StorageReader: Send + Sync {
    /// Settings this storage contributes to a composite.
    fn settings(&self) -> Vec<SettingDescriptor> {
        Vec::new()
    }

    /// Open every byte stream the configured location yields, in a stable
    /// order (e.g. all files under a directory, lexicographically).
    async fn open(
        &self,
        settings: &SettingsMap,
        cancel: CancellationToken,
    ) -> Result<Vec<ByteReader>>;
}

/// Place a byte stream into a backing store. Knows nothing about records.
#[async_trait]
pub trait StorageWriter: Send + Sync {
    /// Settings this storage contributes to a composite.
    fn settings(&self) -> Vec<SettingDescriptor> {
        Vec::new()
    }

    /// Create the output byte stream. `source_name` is available for
    /// provenance-derived naming.
    async fn create(
        &self,
        settings: &SettingsMap,
        source_name: &str,
        cancel: CancellationToken,
    ) -> Result<ByteWriter>;
}

/// Decode a byte stream into records. Knows nothing about where bytes live.
#[async_trait]
pub trait FormatReader: Send + Sync {
    /// Settings this format contributes to a composite.
    fn settings(&self) -> Vec<SettingDescriptor> {
        Vec::new()
    }

    /// Decode one byte stream into a stream of records.
    async fn read_records(&self, input: ByteReader, settings: &SettingsMap)
        -> Result<RecordStream>;
}

/// Encode records into a byte stream. Knows nothing about where bytes go.
#[async_trait]
pub trait FormatWriter: Send + Sync {
    /// Settings this format contributes to a composite.
    fn settings(&self) -> Vec<SettingDescriptor> {
        Vec::new()
    }

    /// Encode the record stream, returning the number of records written.
    async fn write_records(
        &self,
        records: RecordStream,
        output: &mut ByteWriter,
        settings: &SettingsMap,
        cancel: CancellationToken,
    ) -> Result<i64>;
}

/// A source assembled from one storage and one format component.
pub struct CompositeSource {
    name: String,
    aliases: Vec<&'static str>,
    storage: Arc<dyn StorageReader>,
    format: Arc<dyn FormatReader>,
}

impl CompositeSource {
    /// Pair a storage reader with a format reader under a display name.
    pub fn new(
        name: impl Into<String>,
        aliases: &[&'static str],
        storage: Arc<dyn StorageReader>,
        format: Arc<dyn FormatReader>,
    ) -> Self {
        Self {
            name: name.into(),
            aliases: aliases.to_vec(),
            storage,
            format,
        }
    }
}

#[async_trait]
impl DataSource for CompositeSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> Vec<&'static str> {
        self.aliases.clone()
    }

    fn settings(&self) -> Vec<SettingDescriptor> {
        merge_settings(self.storage.settings(), self.format.settings())
    }

    async fn read(
        &self,
        settings: &SettingsMap,
        cancel: CancellationToken,
    ) -> Result<RecordStream> {
        let inputs = self.storage.open(settings, cancel.clone()).await?;
        let format = self.format.clone();
        let settings = settings.clone();

        // Decode lazily, one byte stream at a time, concatenated in
        // storage order.
        let records = stream::iter(inputs)
            .then(move |input| {
                let format = format.clone();
                let settings = settings.clone();
                async move { format.read_records(input, &settings).await }
            })
            .map(|decoded| match decoded {
                Ok(records) => records,
                Err(e) => stream::iter(vec![Err(e)]).boxed(),
            })
            .flatten()
            .boxed();
        Ok(records)
    }
}

/// A sink assembled from one storage and one format component.
pub struct CompositeSink {
    name: String,
    aliases: Vec<&'static str>,
    storage: Arc<dyn StorageWriter>,
    format: Arc<dyn FormatWriter>,
}

impl CompositeSink {
    /// Pair a storage writer with a format writer under a display name.
    pub fn new(
        name: impl Into<String>,
        aliases: &[&'static str],
        storage: Arc<dyn StorageWriter>,
        format: Arc<dyn FormatWriter>,
    ) -> Self {
        Self {
            name: name.into(),
            aliases: aliases.to_vec(),
            storage,
            format,
        }
    }
}

#[async_trait]
impl DataSink for CompositeSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> Vec<&'static str> {
        self.aliases.clone()
    }

    fn settings(&self) -> Vec<SettingDescriptor> {
        merge_settings(self.storage.settings(), self.format.settings())
    }

    async fn write(
        &self,
        records: RecordStream,
        settings: &SettingsMap,
        source_name: &str,
        cancel: CancellationToken,
    ) -> Result<i64> {
        let mut output = self
            .storage
            .create(settings, source_name, cancel.clone())
            .await?;
        let written = self
            .format
            .write_records(records, &mut output, settings, cancel)
            .await?;
        output.shutdown().await?;
        Ok(written)
    }
}

/// Union of two settings schemas; the first occurrence of a name wins.
fn merge_settings(
    mut merged: Vec<SettingDescriptor>,
    other: Vec<SettingDescriptor>,
) -> Vec<SettingDescriptor> {
    for descriptor in other {
        if !merged.iter().any(|d| d.name == descriptor.name) {
            merged.push(descriptor);
        }
    }
    merged
}
