//! CSV format component.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::compose::{ByteReader, ByteWriter, FormatReader, FormatWriter};
use crate::error::{MigrateError, Result};
use crate::extension::RecordStream;
use crate::record::{DataItem, Value};
use crate::settings::{get_bool, get_str, SettingDescriptor, SettingKind, SettingsMap};

/// Reads and writes records as delimited text.
///
/// The reader takes column names from the header row (or synthesizes
/// `column0..n` without one) and optionally infers bool/int/float scalar
/// types from cell text. The writer takes the column set from the first
/// record, projects later records onto it, and flattens nested values to
/// embedded JSON text — CSV has no nesting of its own.
#[derive(Debug, Default)]
pub struct CsvFormat;

impl CsvFormat {
    /// Create the format component.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn shared_settings() -> Vec<SettingDescriptor> {
        vec![
            SettingDescriptor::new("Delimiter", SettingKind::String).with_default(","),
            SettingDescriptor::new("HasHeader", SettingKind::Bool).with_default("true"),
        ]
    }
}

#[async_trait]
impl FormatReader for CsvFormat {
    fn settings(&self) -> Vec<SettingDescriptor> {
        let mut settings = Self::shared_settings();
        settings.push(SettingDescriptor::new("InferTypes", SettingKind::Bool).with_default("true"));
        settings
    }

    async fn read_records(
        &self,
        mut input: ByteReader,
        settings: &SettingsMap,
    ) -> Result<RecordStream> {
        let delimiter = delimiter_from(settings)?;
        let has_header = get_bool(settings, "HasHeader").unwrap_or(true);
        let infer_types = get_bool(settings, "InferTypes").unwrap_or(true);

        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes).await?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(has_header)
            .flexible(true)
            .from_reader(bytes.as_slice());

        let headers: Vec<String> = if has_header {
            reader.headers()?.iter().map(str::to_string).collect()
        } else {
            Vec::new()
        };

        let mut items = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut item = DataItem::with_capacity(row.len());
            for (i, cell) in row.iter().enumerate() {
                let name = headers
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("column{}", i));
                let value = if infer_types {
                    infer_cell(cell)
                } else {
                    Value::String(cell.to_string())
                };
                item.set(name, value);
            }
            items.push(item);
        }

        Ok(stream::iter(items.into_iter().map(Ok)).boxed())
    }
}

#[async_trait]
impl FormatWriter for CsvFormat {
    fn settings(&self) -> Vec<SettingDescriptor> {
        Self::shared_settings()
    }

    async fn write_records(
        &self,
        mut records: RecordStream,
        output: &mut ByteWriter,
        settings: &SettingsMap,
        cancel: CancellationToken,
    ) -> Result<i64> {
        let delimiter = delimiter_from(settings)?;
        let has_header = get_bool(settings, "HasHeader").unwrap_or(true);

        let mut columns: Vec<String> = Vec::new();
        let mut written = 0i64;

        while let Some(record) = records.next().await {
            if cancel.is_cancelled() {
                return Err(MigrateError::Cancelled);
            }
            let record = record?;

            if columns.is_empty() {
                columns = record.field_names().map(str::to_string).collect();
                if has_header {
                    output.write_all(&encode_row(delimiter, &columns)?).await?;
                }
            }

            let cells: Vec<String> = columns
                .iter()
                .map(|name| record.get(name).map_or(String::new(), cell_text))
                .collect();
            output.write_all(&encode_row(delimiter, &cells)?).await?;
            written += 1;
        }
        Ok(written)
    }
}

fn delimiter_from(settings: &SettingsMap) -> Result<u8> {
    let text = get_str(settings, "Delimiter").unwrap_or(",");
    let mut bytes = text.bytes();
    match (bytes.next(), bytes.next()) {
        (Some(b), None) => Ok(b),
        _ => Err(MigrateError::Config(format!(
            "Delimiter must be a single character, got '{}'",
            text
        ))),
    }
}

/// Encode one row through the csv writer, returning its bytes.
fn encode_row(delimiter: u8, cells: &[String]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(cells)?;
    writer
        .into_inner()
        .map_err(|e| MigrateError::Config(format!("CSV buffer error: {}", e)))
}

/// Narrowest scalar interpretation of a cell: bool, then integer, then
/// float, else text. Empty cells read as null.
fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if cell.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if cell.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(v) = cell.parse::<i64>() {
        return Value::from_i64(v);
    }
    if let Ok(v) = cell.parse::<f64>() {
        return Value::Float64(v);
    }
    Value::String(cell.to_string())
}

fn cell_text(value: &Value) -> String {
    value.to_display_string()
}
