//! Descriptor-driven settings validation.

use std::fmt;

use serde_json::Value as Json;

use super::descriptor::{SettingDescriptor, SettingKind};
use super::SettingsMap;

/// A single validation failure, naming the offending property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Property name, optionally prefixed with the settings side
    /// (e.g. `Source:FilePath`) by callers validating both sides.
    pub property: String,
    /// Human-readable rule violation.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error for a property.
    pub fn new(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            message: message.into(),
        }
    }

    /// Return a copy with the property name prefixed (`prefix:property`).
    #[must_use]
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self {
            property: format!("{}:{}", prefix, self.property),
            message: self.message.clone(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property, self.message)
    }
}

/// Validate a settings object against its descriptors.
///
/// Every violation is collected — callers report the full list, never just
/// the first failure. An empty result means the settings are valid. A failed
/// validation aborts the operation before any I/O occurs.
pub fn validate_settings(
    descriptors: &[SettingDescriptor],
    values: &SettingsMap,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for descriptor in descriptors {
        let value = values.get(&descriptor.name).filter(|v| !v.is_null());

        let Some(value) = value else {
            if descriptor.is_required {
                errors.push(ValidationError::new(
                    &descriptor.name,
                    "required setting is missing",
                ));
            }
            continue;
        };

        match descriptor.kind {
            SettingKind::String => {
                if descriptor.is_required
                    && value.as_str().is_some_and(|s| s.trim().is_empty())
                {
                    errors.push(ValidationError::new(
                        &descriptor.name,
                        "required setting must not be blank",
                    ));
                }
            }
            SettingKind::Enum => match value.as_str() {
                Some(s) if descriptor.valid_values.iter().any(|v| v == s) => {}
                Some(s) => errors.push(ValidationError::new(
                    &descriptor.name,
                    format!(
                        "value '{}' is not one of: {}",
                        s,
                        descriptor.valid_values.join(", ")
                    ),
                )),
                None => errors.push(ValidationError::new(
                    &descriptor.name,
                    "enum setting must be a string",
                )),
            },
            SettingKind::Undeclared => {
                if !parses_as_structured(value) {
                    errors.push(ValidationError::new(
                        &descriptor.name,
                        "must be (or parse as) a JSON object or array",
                    ));
                }
            }
            _ => {}
        }
    }

    errors
}

/// An undeclared blob is acceptable when it is already structured JSON, or a
/// string that parses into structured JSON.
fn parses_as_structured(value: &Json) -> bool {
    match value {
        Json::Object(_) | Json::Array(_) => true,
        Json::String(text) => matches!(
            serde_json::from_str::<Json>(text),
            Ok(Json::Object(_)) | Ok(Json::Array(_))
        ),
        _ => false,
    }
}

/// Render a setting value for logs/UIs, masking sensitive values.
#[must_use]
pub fn mask_sensitive(descriptor: &SettingDescriptor, value: &Json) -> String {
    if descriptor.is_sensitive {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(pairs: &[(&str, Json)]) -> SettingsMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn descriptors() -> Vec<SettingDescriptor> {
        vec![
            SettingDescriptor::new("FilePath", SettingKind::String).required(),
            SettingDescriptor::new("ConnectionString", SettingKind::String)
                .required()
                .sensitive(),
            SettingDescriptor::new("Mode", SettingKind::Enum)
                .with_valid_values(["insert", "upsert", "delete"]),
            SettingDescriptor::new("RawProperties", SettingKind::Undeclared),
            SettingDescriptor::new("BatchSize", SettingKind::Int).with_default("100"),
        ]
    }

    #[test]
    fn test_valid_settings_pass() {
        let values = settings(&[
            ("FilePath", json!("./data.json")),
            ("ConnectionString", json!("Server=x")),
            ("Mode", json!("upsert")),
        ]);
        assert!(validate_settings(&descriptors(), &values).is_empty());
    }

    #[test]
    fn test_two_missing_required_both_named() {
        let values = settings(&[]);
        let errors = validate_settings(&descriptors(), &values);
        let properties: Vec<_> = errors.iter().map(|e| e.property.as_str()).collect();
        assert_eq!(properties, vec!["FilePath", "ConnectionString"]);
    }

    #[test]
    fn test_blank_required_string_rejected() {
        let values = settings(&[
            ("FilePath", json!("   ")),
            ("ConnectionString", json!("Server=x")),
        ]);
        let errors = validate_settings(&descriptors(), &values);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].property, "FilePath");
        assert!(errors[0].message.contains("blank"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let values = settings(&[
            ("FilePath", json!(null)),
            ("ConnectionString", json!("Server=x")),
        ]);
        let errors = validate_settings(&descriptors(), &values);
        assert_eq!(errors[0].property, "FilePath");
        assert!(errors[0].message.contains("missing"));
    }

    #[test]
    fn test_enum_value_outside_set_rejected() {
        let values = settings(&[
            ("FilePath", json!("f")),
            ("ConnectionString", json!("c")),
            ("Mode", json!("merge")),
        ]);
        let errors = validate_settings(&descriptors(), &values);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].property, "Mode");
        assert!(errors[0].message.contains("insert, upsert, delete"));
    }

    #[test]
    fn test_optional_enum_absent_is_fine() {
        let values = settings(&[("FilePath", json!("f")), ("ConnectionString", json!("c"))]);
        assert!(validate_settings(&descriptors(), &values).is_empty());
    }

    #[test]
    fn test_undeclared_accepts_structured_json() {
        let base = [("FilePath", json!("f")), ("ConnectionString", json!("c"))];

        let mut values = settings(&base);
        values.insert("RawProperties".into(), json!({"retries": 3}));
        assert!(validate_settings(&descriptors(), &values).is_empty());

        let mut values = settings(&base);
        values.insert("RawProperties".into(), json!(r#"{"retries": 3}"#));
        assert!(validate_settings(&descriptors(), &values).is_empty());
    }

    #[test]
    fn test_undeclared_rejects_unparseable_blob() {
        let mut values = settings(&[("FilePath", json!("f")), ("ConnectionString", json!("c"))]);
        values.insert("RawProperties".into(), json!("{not json"));
        let errors = validate_settings(&descriptors(), &values);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].property, "RawProperties");
    }

    #[test]
    fn test_prefixed_error() {
        let e = ValidationError::new("FilePath", "m").prefixed("Source");
        assert_eq!(e.property, "Source:FilePath");
    }

    #[test]
    fn test_mask_sensitive_redacts() {
        let d = SettingDescriptor::new("Password", SettingKind::String).sensitive();
        assert_eq!(mask_sensitive(&d, &json!("hunter2")), "[REDACTED]");
        let d = SettingDescriptor::new("Host", SettingKind::String);
        assert_eq!(mask_sensitive(&d, &json!("h")), "\"h\"");
    }
}
