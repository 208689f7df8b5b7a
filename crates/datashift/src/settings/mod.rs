//! Settings metadata and validation.
//!
//! Every extension declares its configurable properties as a list of
//! [`SettingDescriptor`]s — an explicit schema, registered by the extension
//! itself. The registry and CLI introspect descriptors without running the
//! extension; validation checks a JSON settings object against them and
//! aggregates every violation instead of stopping at the first.

mod descriptor;
mod validation;

pub use descriptor::{SettingDescriptor, SettingKind};
pub use validation::{mask_sensitive, validate_settings, ValidationError};

/// A JSON object holding one extension's resolved setting values.
pub type SettingsMap = serde_json::Map<String, serde_json::Value>;

/// String value of a setting, if present and a string.
#[must_use]
pub fn get_str<'a>(settings: &'a SettingsMap, name: &str) -> Option<&'a str> {
    settings.get(name).and_then(|v| v.as_str())
}

/// Boolean value of a setting. Accepts JSON booleans and the textual
/// `"true"`/`"false"` forms settings files sometimes carry.
#[must_use]
pub fn get_bool(settings: &SettingsMap, name: &str) -> Option<bool> {
    match settings.get(name)? {
        serde_json::Value::Bool(v) => Some(*v),
        serde_json::Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Integer value of a setting.
#[must_use]
pub fn get_i64(settings: &SettingsMap, name: &str) -> Option<i64> {
    settings.get(name).and_then(|v| v.as_i64())
}
