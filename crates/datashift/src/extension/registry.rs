//! Extension discovery and lookup.
//!
//! Extensions are compiled in and registered at construction — the
//! discovery directory scan is retained for contract fidelity (it is
//! created if missing, and candidate packages matching the naming
//! convention are reported), but packages found there are skipped with a
//! warning rather than loaded. A skipped candidate is never a fatal error.
//!
//! # Adding New Extensions
//!
//! 1. Implement `DataSource` and/or `DataSink` (or pair a storage and a
//!    format component into a composite)
//! 2. Register the instance in `ExtensionRegistry::with_builtins()`
//! 3. Declare its settings descriptors so `settings`/`list` introspection
//!    picks it up

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::manifest::{ExtensionEntry, ExtensionManifest};
use super::{DataSink, DataSource, Direction};
use crate::compose::{CompositeSink, CompositeSource};
use crate::error::Result;
use crate::format::{CsvFormat, JsonFormat};
use crate::storage::LocalFileStorage;

/// Environment override for the extension package directory.
pub const EXTENSIONS_DIR_ENV: &str = "DATASHIFT_EXTENSIONS_PATH";

/// Naming convention for out-of-process extension packages.
const EXTENSION_PACKAGE_PREFIX: &str = "datashift-ext-";

/// Registry of loaded source and sink extensions.
///
/// Read-only after load; shared across an operation via `Arc`.
#[derive(Default)]
pub struct ExtensionRegistry {
    sources: Vec<Arc<dyn DataSource>>,
    sinks: Vec<Arc<dyn DataSink>>,
}

impl ExtensionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in extension set: the storage ×
    /// format matrix of local files with JSON and CSV.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let storage = Arc::new(LocalFileStorage::new());
        let json = Arc::new(JsonFormat::new());
        let csv = Arc::new(CsvFormat::new());

        registry.register_source(Arc::new(CompositeSource::new(
            "json-file",
            &["json"],
            storage.clone(),
            json.clone(),
        )));
        registry.register_sink(Arc::new(CompositeSink::new(
            "json-file",
            &["json"],
            storage.clone(),
            json,
        )));
        registry.register_source(Arc::new(CompositeSource::new(
            "csv-file",
            &["csv"],
            storage.clone(),
            csv.clone(),
        )));
        registry.register_sink(Arc::new(CompositeSink::new(
            "csv-file",
            &["csv"],
            storage,
            csv,
        )));
        registry
    }

    /// Discover extensions.
    ///
    /// Resolves the extension directory (explicit path, else the
    /// `DATASHIFT_EXTENSIONS_PATH` environment override, else an
    /// `extensions/` folder beside the executable), creating it if absent,
    /// then loads the compiled-in extension set. Candidate packages found
    /// in the directory are skipped with a warning.
    pub fn discover(search_path: Option<&Path>) -> Result<Self> {
        let dir = resolve_extensions_dir(search_path);
        fs::create_dir_all(&dir)?;
        scan_packages(&dir);

        let registry = Self::with_builtins();
        for source in &registry.sources {
            debug!("Loaded source extension: {}", source.name());
        }
        for sink in &registry.sinks {
            debug!("Loaded sink extension: {}", sink.name());
        }
        info!(
            "Loaded {} source and {} sink extensions",
            registry.sources.len(),
            registry.sinks.len()
        );
        Ok(registry)
    }

    /// Register a source extension.
    pub fn register_source(&mut self, source: Arc<dyn DataSource>) {
        self.sources.push(source);
    }

    /// Register a sink extension.
    pub fn register_sink(&mut self, sink: Arc<dyn DataSink>) {
        self.sinks.push(sink);
    }

    /// All loaded source extensions.
    #[must_use]
    pub fn sources(&self) -> &[Arc<dyn DataSource>] {
        &self.sources
    }

    /// All loaded sink extensions.
    #[must_use]
    pub fn sinks(&self) -> &[Arc<dyn DataSink>] {
        &self.sinks
    }

    /// Find a source by display name or alias, case-insensitively.
    #[must_use]
    pub fn find_source(&self, name: &str) -> Option<Arc<dyn DataSource>> {
        self.sources
            .iter()
            .find(|s| matches_name(s.name(), &s.aliases(), name))
            .cloned()
    }

    /// Find a sink by display name or alias, case-insensitively.
    #[must_use]
    pub fn find_sink(&self, name: &str) -> Option<Arc<dyn DataSink>> {
        self.sinks
            .iter()
            .find(|s| matches_name(s.name(), &s.aliases(), name))
            .cloned()
    }

    /// Build the introspection manifest for one direction, or both when
    /// `direction` is `None`.
    #[must_use]
    pub fn build_manifest(&self, direction: Option<Direction>) -> ExtensionManifest {
        let mut extensions = Vec::new();

        if direction != Some(Direction::Sink) {
            for source in &self.sources {
                extensions.push(ExtensionEntry {
                    name: source.name().to_string(),
                    direction: Direction::Source,
                    version: source.version().to_string(),
                    settings: source.settings(),
                });
            }
        }
        if direction != Some(Direction::Source) {
            for sink in &self.sinks {
                extensions.push(ExtensionEntry {
                    name: sink.name().to_string(),
                    direction: Direction::Sink,
                    version: sink.version().to_string(),
                    settings: sink.settings(),
                });
            }
        }

        ExtensionManifest {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            extensions,
        }
    }
}

fn matches_name(name: &str, aliases: &[&str], query: &str) -> bool {
    name.eq_ignore_ascii_case(query) || aliases.iter().any(|a| a.eq_ignore_ascii_case(query))
}

fn resolve_extensions_dir(search_path: Option<&Path>) -> PathBuf {
    if let Some(path) = search_path {
        return path.to_path_buf();
    }
    if let Ok(path) = env::var(EXTENSIONS_DIR_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("extensions")
}

fn scan_packages(dir: &Path) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not scan extension directory {:?}: {}", dir, e);
            return;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(EXTENSION_PACKAGE_PREFIX) {
            warn!(
                "Skipping extension package '{}': out-of-process packages \
                 are not supported by this build",
                name
            );
        } else {
            debug!("Ignoring non-extension entry '{}'", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered_both_directions() {
        let registry = ExtensionRegistry::with_builtins();
        let source_names: Vec<_> = registry.sources().iter().map(|s| s.name()).collect();
        let sink_names: Vec<_> = registry.sinks().iter().map(|s| s.name()).collect();
        assert!(source_names.contains(&"json-file"));
        assert!(source_names.contains(&"csv-file"));
        assert!(sink_names.contains(&"json-file"));
        assert!(sink_names.contains(&"csv-file"));
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let registry = ExtensionRegistry::with_builtins();
        assert!(registry.find_source("JSON-File").is_some());
        assert!(registry.find_sink("CSV-FILE").is_some());
        assert!(registry.find_source("parquet-file").is_none());
    }

    #[test]
    fn test_find_by_alias() {
        let registry = ExtensionRegistry::with_builtins();
        let source = registry.find_source("json").unwrap();
        assert_eq!(source.name(), "json-file");
    }

    #[test]
    fn test_manifest_filters_by_direction() {
        let registry = ExtensionRegistry::with_builtins();
        let manifest = registry.build_manifest(Some(Direction::Source));
        assert!(manifest
            .extensions
            .iter()
            .all(|e| e.direction == Direction::Source));
        assert_eq!(manifest.extensions.len(), registry.sources().len());

        let full = registry.build_manifest(None);
        assert_eq!(
            full.extensions.len(),
            registry.sources().len() + registry.sinks().len()
        );
        assert_eq!(full.tool_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_discover_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exts");
        assert!(!target.exists());
        let registry = ExtensionRegistry::discover(Some(&target)).unwrap();
        assert!(target.is_dir());
        assert!(!registry.sources().is_empty());
    }

    #[test]
    fn test_discover_skips_candidate_packages() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("datashift-ext-parquet.so"), b"").unwrap();
        // Not fatal: the registry still loads the built-ins.
        let registry = ExtensionRegistry::discover(Some(dir.path())).unwrap();
        assert!(registry.find_source("json-file").is_some());
    }
}
