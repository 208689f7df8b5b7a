//! JSON format component.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value as Json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::compose::{ByteReader, ByteWriter, FormatReader, FormatWriter};
use crate::error::{MigrateError, Result};
use crate::extension::RecordStream;
use crate::record::DataItem;
use crate::settings::{get_bool, SettingDescriptor, SettingKind, SettingsMap};

/// Reads and writes records as JSON.
///
/// The reader accepts a top-level array of objects or a single object.
/// The writer emits an array, one element per record, optionally indented.
/// Numeric and date/time fidelity follows the canonical serialization
/// contract on [`crate::record::Value`].
#[derive(Debug, Default)]
pub struct JsonFormat;

impl JsonFormat {
    /// Create the format component.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FormatReader for JsonFormat {
    async fn read_records(
        &self,
        mut input: ByteReader,
        _settings: &SettingsMap,
    ) -> Result<RecordStream> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes).await?;

        let document: Json = serde_json::from_slice(&bytes)?;
        let items = match document {
            Json::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in &elements {
                    items.push(element_to_item(element)?);
                }
                items
            }
            Json::Object(ref map) => vec![DataItem::from_json_object(map)],
            other => {
                return Err(MigrateError::Config(format!(
                    "Top-level JSON must be an array or object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        Ok(stream::iter(items.into_iter().map(Ok)).boxed())
    }
}

#[async_trait]
impl FormatWriter for JsonFormat {
    fn settings(&self) -> Vec<SettingDescriptor> {
        vec![SettingDescriptor::new("Indented", SettingKind::Bool).with_default("false")]
    }

    async fn write_records(
        &self,
        mut records: RecordStream,
        output: &mut ByteWriter,
        settings: &SettingsMap,
        cancel: CancellationToken,
    ) -> Result<i64> {
        let indented = get_bool(settings, "Indented").unwrap_or(false);
        let mut written = 0i64;

        output.write_all(b"[").await?;
        while let Some(record) = records.next().await {
            if cancel.is_cancelled() {
                return Err(MigrateError::Cancelled);
            }
            let record = record?;
            if written > 0 {
                output.write_all(b",").await?;
            }
            output.write_all(b"\n").await?;
            let json = record.to_json();
            let text = if indented {
                serde_json::to_string_pretty(&json)?
            } else {
                serde_json::to_string(&json)?
            };
            output.write_all(text.as_bytes()).await?;
            written += 1;
        }
        output.write_all(b"\n]\n").await?;
        Ok(written)
    }
}

fn element_to_item(element: &Json) -> Result<DataItem> {
    match element {
        Json::Object(map) => Ok(DataItem::from_json_object(map)),
        other => Err(MigrateError::Config(format!(
            "JSON array elements must be objects, got {}",
            json_type_name(other)
        ))),
    }
}

fn json_type_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}
