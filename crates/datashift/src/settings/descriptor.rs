//! Typed descriptors for extension settings.

use serde::{Deserialize, Serialize};

/// The declared kind of a setting value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    String,
    Bool,
    Int,
    Float,
    DateTime,
    Enum,
    Array,
    /// Freeform structured blob passed through to the backing store
    /// (e.g. raw connection properties). Must parse as JSON.
    Undeclared,
}

/// Metadata for one configurable property of an extension.
///
/// Immutable after construction; built once per extension and shared via
/// the manifest. Serializes with the wire field names consumed by UIs
/// (`Name`, `Type`, `IsRequired`, `IsSensitive`, `DefaultValue`,
/// `ValidValues`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SettingDescriptor {
    /// Property name as it appears in the settings object.
    pub name: String,

    /// Declared value kind.
    #[serde(rename = "Type")]
    pub kind: SettingKind,

    /// Whether a value must be supplied.
    pub is_required: bool,

    /// Sensitive values (passwords, connection strings) are never echoed
    /// in plaintext logs or UIs.
    pub is_sensitive: bool,

    /// Default applied when no value is supplied.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub default_value: Option<String>,

    /// Closed set of valid textual values, for `Enum` kind.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub valid_values: Vec<String>,
}

impl SettingDescriptor {
    /// Create a descriptor with the given name and kind.
    pub fn new(name: impl Into<String>, kind: SettingKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_required: false,
            is_sensitive: false,
            default_value: None,
            valid_values: Vec::new(),
        }
    }

    /// Mark the setting as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    /// Mark the setting as sensitive.
    #[must_use]
    pub fn sensitive(mut self) -> Self {
        self.is_sensitive = true;
        self
    }

    /// Set the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Set the closed value set for an `Enum`-kind setting.
    #[must_use]
    pub fn with_valid_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_values = values.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let d = SettingDescriptor::new("Mode", SettingKind::Enum)
            .required()
            .with_default("insert")
            .with_valid_values(["insert", "upsert", "delete"]);
        assert_eq!(d.name, "Mode");
        assert!(d.is_required);
        assert!(!d.is_sensitive);
        assert_eq!(d.default_value.as_deref(), Some("insert"));
        assert_eq!(d.valid_values.len(), 3);
    }

    #[test]
    fn test_wire_field_names() {
        let d = SettingDescriptor::new("ConnectionString", SettingKind::String)
            .required()
            .sensitive();
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["Name"], "ConnectionString");
        assert_eq!(json["Type"], "string");
        assert_eq!(json["IsRequired"], true);
        assert_eq!(json["IsSensitive"], true);
        // Empty optionals stay off the wire.
        assert!(json.get("DefaultValue").is_none());
        assert!(json.get("ValidValues").is_none());
    }

    #[test]
    fn test_enum_valid_values_serialized_as_names() {
        let d = SettingDescriptor::new("Compression", SettingKind::Enum)
            .with_valid_values(["None", "Gzip"]);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["ValidValues"], serde_json::json!(["None", "Gzip"]));
    }
}
