//! Run configuration: the settings file model and its resolution.
//!
//! Effective configuration merges three layers, in increasing precedence:
//! environment defaults, the settings file, explicit CLI overrides.
//! (Flag > file > environment — the documented order.)

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use crate::error::{MigrateError, Result};
use crate::settings::SettingsMap;

/// Environment default for the source extension name.
pub const SOURCE_ENV: &str = "DATASHIFT_SOURCE";

/// Environment default for the sink extension name.
pub const SINK_ENV: &str = "DATASHIFT_SINK";

/// Settings file looked up in the working directory when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = "migration-settings.json";

/// The JSON settings file shape.
///
/// A file declares a top-level source/sink pair plus their settings, and/or
/// an `Operations` array whose entries override just one side — enabling
/// one-to-many and many-to-one fan-out without duplicating the unchanged
/// side's configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RunSettings {
    /// Source extension display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Sink extension display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink: Option<String>,

    /// Settings for the source extension.
    pub source_settings: SettingsMap,

    /// Settings for the sink extension.
    pub sink_settings: SettingsMap,

    /// Per-operation overrides, executed sequentially in declared order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<OperationSettings>,
}

/// One entry of the `Operations` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OperationSettings {
    /// Override the source extension for this operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Override the sink extension for this operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink: Option<String>,

    /// Per-key overrides of the top-level source settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_settings: Option<SettingsMap>,

    /// Per-key overrides of the top-level sink settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink_settings: Option<SettingsMap>,
}

impl RunSettings {
    /// Load and parse a settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MigrateError::Config(format!("Cannot read settings file {:?}: {}", path, e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            MigrateError::Config(format!("Malformed settings file {:?}: {}", path, e))
        })
    }

    /// The default settings file in the working directory, if present.
    #[must_use]
    pub fn find_default() -> Option<PathBuf> {
        let path = PathBuf::from(DEFAULT_SETTINGS_FILE);
        path.is_file().then_some(path)
    }

    /// A starter settings file, optionally with an `Operations` skeleton.
    #[must_use]
    pub fn template(multi: bool) -> Self {
        let mut settings = RunSettings {
            source: Some("json-file".to_string()),
            sink: Some("csv-file".to_string()),
            ..Default::default()
        };
        settings
            .source_settings
            .insert("FilePath".to_string(), json!("./data.json"));
        settings
            .sink_settings
            .insert("FilePath".to_string(), json!("./output.csv"));

        if multi {
            for i in 1..=2 {
                let mut sink_settings = SettingsMap::new();
                sink_settings.insert("FilePath".to_string(), json!(format!("./output-{i}.csv")));
                settings.operations.push(OperationSettings {
                    sink_settings: Some(sink_settings),
                    ..Default::default()
                });
            }
        }
        settings
    }
}

/// Explicit CLI overrides — the highest-precedence layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--source` flag.
    pub source: Option<String>,

    /// `--sink` flag.
    pub sink: Option<String>,

    /// `--source-setting KEY=VALUE` pairs.
    pub source_settings: Vec<(String, Json)>,

    /// `--sink-setting KEY=VALUE` pairs.
    pub sink_settings: Vec<(String, Json)>,
}

/// Resolved configuration for one run: extension names plus the ordered
/// list of operations to execute.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Run-level source extension name.
    pub source: Option<String>,

    /// Run-level sink extension name.
    pub sink: Option<String>,

    /// Operations in execution order; never empty.
    pub operations: Vec<OperationConfig>,
}

/// One resolved source→sink transfer.
#[derive(Debug, Clone, Default)]
pub struct OperationConfig {
    /// Per-operation source extension override.
    pub source: Option<String>,

    /// Per-operation sink extension override.
    pub sink: Option<String>,

    /// Effective source settings.
    pub source_settings: SettingsMap,

    /// Effective sink settings.
    pub sink_settings: SettingsMap,
}

impl RunConfig {
    /// Start building a single-operation config programmatically.
    #[must_use]
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Merge the configuration layers: environment defaults, then the
    /// settings file, then explicit overrides.
    #[must_use]
    pub fn resolve(file: Option<RunSettings>, overrides: ConfigOverrides) -> Self {
        Self::resolve_with_env(
            file,
            overrides,
            env::var(SOURCE_ENV).ok(),
            env::var(SINK_ENV).ok(),
        )
    }

    fn resolve_with_env(
        file: Option<RunSettings>,
        overrides: ConfigOverrides,
        env_source: Option<String>,
        env_sink: Option<String>,
    ) -> Self {
        let file = file.unwrap_or_default();

        let source = overrides
            .source
            .or(file.source)
            .or(env_source.filter(|s| !s.is_empty()));
        let sink = overrides
            .sink
            .or(file.sink)
            .or(env_sink.filter(|s| !s.is_empty()));

        let operations = if file.operations.is_empty() {
            vec![OperationConfig {
                source: None,
                sink: None,
                source_settings: merge_maps(
                    file.source_settings.clone(),
                    None,
                    &overrides.source_settings,
                ),
                sink_settings: merge_maps(
                    file.sink_settings.clone(),
                    None,
                    &overrides.sink_settings,
                ),
            }]
        } else {
            file.operations
                .iter()
                .map(|op| OperationConfig {
                    source: op.source.clone(),
                    sink: op.sink.clone(),
                    source_settings: merge_maps(
                        file.source_settings.clone(),
                        op.source_settings.as_ref(),
                        &overrides.source_settings,
                    ),
                    sink_settings: merge_maps(
                        file.sink_settings.clone(),
                        op.sink_settings.as_ref(),
                        &overrides.sink_settings,
                    ),
                })
                .collect()
        };

        RunConfig {
            source,
            sink,
            operations,
        }
    }
}

/// Layered per-key merge: file top-level, then operation entry, then CLI.
fn merge_maps(
    mut base: SettingsMap,
    operation: Option<&SettingsMap>,
    overrides: &[(String, Json)],
) -> SettingsMap {
    if let Some(operation) = operation {
        for (key, value) in operation {
            base.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in overrides {
        base.insert(key.clone(), value.clone());
    }
    base
}

/// Parse a `KEY=VALUE` override. The value is taken as JSON when it parses
/// as JSON (`true`, `5`, `{"a":1}`), else as a plain string.
pub fn parse_setting_override(spec: &str) -> Result<(String, Json)> {
    let (key, value) = spec.split_once('=').ok_or_else(|| {
        MigrateError::Config(format!("Setting override '{}' must be KEY=VALUE", spec))
    })?;
    if key.trim().is_empty() {
        return Err(MigrateError::Config(format!(
            "Setting override '{}' has an empty key",
            spec
        )));
    }
    let json = serde_json::from_str::<Json>(value)
        .unwrap_or_else(|_| Json::String(value.to_string()));
    Ok((key.trim().to_string(), json))
}

/// Builder for a programmatic single-operation [`RunConfig`].
#[derive(Debug, Default)]
pub struct RunConfigBuilder {
    source: Option<String>,
    sink: Option<String>,
    source_settings: SettingsMap,
    sink_settings: SettingsMap,
}

impl RunConfigBuilder {
    /// Set the source extension name.
    #[must_use]
    pub fn source(mut self, name: impl Into<String>) -> Self {
        self.source = Some(name.into());
        self
    }

    /// Set the sink extension name.
    #[must_use]
    pub fn sink(mut self, name: impl Into<String>) -> Self {
        self.sink = Some(name.into());
        self
    }

    /// Set one source setting.
    #[must_use]
    pub fn source_setting(mut self, key: impl Into<String>, value: impl Into<Json>) -> Self {
        self.source_settings.insert(key.into(), value.into());
        self
    }

    /// Set one sink setting.
    #[must_use]
    pub fn sink_setting(mut self, key: impl Into<String>, value: impl Into<Json>) -> Self {
        self.sink_settings.insert(key.into(), value.into());
        self
    }

    /// Build the single-operation config.
    #[must_use]
    pub fn build(self) -> RunConfig {
        RunConfig {
            source: self.source,
            sink: self.sink,
            operations: vec![OperationConfig {
                source: None,
                sink: None,
                source_settings: self.source_settings,
                sink_settings: self.sink_settings,
            }],
        }
    }
}
