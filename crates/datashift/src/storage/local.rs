//! Local filesystem storage component.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::compose::{ByteReader, ByteWriter, StorageReader, StorageWriter};
use crate::error::{MigrateError, Result};
use crate::settings::{get_bool, get_str, SettingDescriptor, SettingKind, SettingsMap};

/// Reads and writes byte streams on the local filesystem.
///
/// Reading accepts either a single file or a directory; a directory yields
/// every regular file directly under it, in lexicographic order. Writing
/// creates parent directories as needed and either truncates or appends.
/// When no path is configured for a write, the output file is named after
/// the producing source extension.
#[derive(Debug, Default)]
pub struct LocalFileStorage;

impl LocalFileStorage {
    /// Create the storage component.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageReader for LocalFileStorage {
    fn settings(&self) -> Vec<SettingDescriptor> {
        vec![SettingDescriptor::new("FilePath", SettingKind::String).required()]
    }

    async fn open(
        &self,
        settings: &SettingsMap,
        _cancel: CancellationToken,
    ) -> Result<Vec<ByteReader>> {
        let path = get_str(settings, "FilePath")
            .ok_or_else(|| MigrateError::Config("FilePath is required".to_string()))?;
        let path = Path::new(path);

        let files = collect_files(path).await?;
        debug!("Opening {} file(s) under {:?}", files.len(), path);

        let mut readers: Vec<ByteReader> = Vec::with_capacity(files.len());
        for file in files {
            readers.push(Box::new(File::open(&file).await?));
        }
        Ok(readers)
    }
}

#[async_trait]
impl StorageWriter for LocalFileStorage {
    fn settings(&self) -> Vec<SettingDescriptor> {
        vec![
            SettingDescriptor::new("FilePath", SettingKind::String),
            SettingDescriptor::new("Append", SettingKind::Bool).with_default("false"),
        ]
    }

    async fn create(
        &self,
        settings: &SettingsMap,
        source_name: &str,
        _cancel: CancellationToken,
    ) -> Result<ByteWriter> {
        let path = match get_str(settings, "FilePath") {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            // Provenance naming: fall back to the producing source.
            _ => PathBuf::from(format!("{}-output", source_name)),
        };
        let append = get_bool(settings, "Append").unwrap_or(false);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = if append {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?
        } else {
            File::create(&path).await?
        };
        debug!("Writing to {:?} (append: {})", path, append);
        Ok(Box::new(file))
    }
}

/// Expand a path into the ordered list of files to read.
async fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    let metadata = tokio::fs::metadata(path).await.map_err(|_| {
        MigrateError::Config(format!("FilePath {:?} does not exist", path))
    })?;

    if metadata.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    if files.is_empty() {
        return Err(MigrateError::Config(format!(
            "Directory {:?} contains no files",
            path
        )));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn settings(pairs: &[(&str, serde_json::Value)]) -> SettingsMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    async fn read_all(mut readers: Vec<ByteReader>) -> Vec<String> {
        let mut out = Vec::new();
        for reader in &mut readers {
            let mut text = String::new();
            reader.read_to_string(&mut text).await.unwrap();
            out.push(text);
        }
        out
    }

    #[tokio::test]
    async fn test_open_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.json");
        std::fs::write(&file, "hello").unwrap();

        let storage = LocalFileStorage::new();
        let settings = settings(&[("FilePath", json!(file.to_str().unwrap()))]);
        let readers = storage
            .open(&settings, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(read_all(readers).await, vec!["hello"]);
    }

    #[tokio::test]
    async fn test_open_directory_in_lexicographic_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "second").unwrap();
        std::fs::write(dir.path().join("a.json"), "first").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let storage = LocalFileStorage::new();
        let settings = settings(&[("FilePath", json!(dir.path().to_str().unwrap()))]);
        let readers = storage
            .open(&settings, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(read_all(readers).await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_open_missing_path_is_config_error() {
        let storage = LocalFileStorage::new();
        let settings = settings(&[("FilePath", json!("/no/such/path"))]);
        let err = match storage.open(&settings, CancellationToken::new()).await {
            Ok(_) => panic!("called `Result::unwrap_err()` on an `Ok` value"),
            Err(e) => e,
        };
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[tokio::test]
    async fn test_create_truncates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let storage = LocalFileStorage::new();
        let base = settings(&[("FilePath", json!(path.to_str().unwrap()))]);

        let mut writer = storage
            .create(&base, "json-file", CancellationToken::new())
            .await
            .unwrap();
        writer.write_all(b"one").await.unwrap();
        writer.shutdown().await.unwrap();

        let mut with_append = base.clone();
        with_append.insert("Append".into(), json!(true));
        let mut writer = storage
            .create(&with_append, "json-file", CancellationToken::new())
            .await
            .unwrap();
        writer.write_all(b"two").await.unwrap();
        writer.shutdown().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "onetwo");
    }

    #[tokio::test]
    async fn test_create_makes_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep/nested/out.txt");
        let storage = LocalFileStorage::new();
        let base = settings(&[("FilePath", json!(path.to_str().unwrap()))]);

        let mut writer = storage
            .create(&base, "json-file", CancellationToken::new())
            .await
            .unwrap();
        writer.write_all(b"x").await.unwrap();
        writer.shutdown().await.unwrap();
        assert!(path.exists());
    }
}
