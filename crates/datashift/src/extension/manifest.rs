//! Introspection manifest for loaded extensions.

use serde::Serialize;

use super::Direction;
use crate::settings::SettingDescriptor;

/// Snapshot of every loaded extension and its settings schema.
///
/// Built on demand by the registry; never persisted by the core. Callers
/// may serialize it to JSON as an external artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtensionManifest {
    /// Version of the engine that produced the manifest.
    pub tool_version: String,

    /// One entry per loaded extension.
    pub extensions: Vec<ExtensionEntry>,
}

/// One extension's identity and settings schema.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtensionEntry {
    /// Display name.
    pub name: String,

    /// Whether the extension is a source or a sink.
    pub direction: Direction,

    /// Extension version.
    pub version: String,

    /// Settings descriptors, in declaration order.
    pub settings: Vec<SettingDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingKind;

    #[test]
    fn test_manifest_wire_shape() {
        let manifest = ExtensionManifest {
            tool_version: "0.4.0".to_string(),
            extensions: vec![ExtensionEntry {
                name: "json-file".to_string(),
                direction: Direction::Source,
                version: "0.4.0".to_string(),
                settings: vec![
                    SettingDescriptor::new("FilePath", SettingKind::String).required()
                ],
            }],
        };

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["ToolVersion"], "0.4.0");
        assert_eq!(json["Extensions"][0]["Name"], "json-file");
        assert_eq!(json["Extensions"][0]["Direction"], "source");
        assert_eq!(json["Extensions"][0]["Settings"][0]["Name"], "FilePath");
    }
}
