//! Projection of a record into a plain nested JSON tree.
//!
//! Sinks that hand documents to a storage client need a native in-memory
//! tree rather than a [`DataItem`]. The projection applies the document-id
//! normalization and null-suppression rules at this boundary so every sink
//! sees identical behavior.

use serde_json::{Map, Value as Json};
use uuid::Uuid;

use super::item::DataItem;
use super::value::Value;

/// Options controlling the tree projection.
#[derive(Debug, Clone, Copy)]
pub struct TreeOptions {
    /// Guarantee a string-typed `id` field on the root object, synthesizing
    /// a random identifier when the record has none.
    pub require_string_id: bool,

    /// When a mixed-case id variant (`ID`, `Id`, …) is normalized into the
    /// canonical lowercase `id`, keep the original-case field too. Setting
    /// this to false leaves only the canonical `id`.
    pub preserve_mixed_case_ids: bool,

    /// Omit null object fields (at any depth) from the tree. Null *array
    /// elements* are always retained — slot positions carry meaning.
    pub ignore_null_values: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            require_string_id: false,
            preserve_mixed_case_ids: true,
            ignore_null_values: false,
        }
    }
}

/// Build the dynamic object tree for a record.
pub fn build_tree(item: &DataItem, options: &TreeOptions) -> Json {
    let mut map = object_tree(item, options.ignore_null_values);
    if options.require_string_id {
        normalize_id(item, &mut map, options.preserve_mixed_case_ids);
    }
    Json::Object(map)
}

/// Id normalization applies to the root object only: a document has one id.
fn normalize_id(item: &DataItem, map: &mut Map<String, Json>, preserve_mixed_case: bool) {
    let id = match item.get("id") {
        Some(value) => stringify_id(value),
        None => match item.get_ignore_case("id") {
            Some((_, value)) => {
                let id = stringify_id(value);
                if !preserve_mixed_case {
                    map.retain(|name, _| !name.eq_ignore_ascii_case("id"));
                }
                id
            }
            None => Uuid::new_v4().to_string(),
        },
    };
    map.remove("id");
    // Canonical id leads the document.
    let mut reordered = Map::with_capacity(map.len() + 1);
    reordered.insert("id".to_string(), Json::String(id));
    for (name, value) in std::mem::take(map) {
        reordered.insert(name, value);
    }
    *map = reordered;
}

fn stringify_id(value: &Value) -> String {
    match value {
        Value::Null => Uuid::new_v4().to_string(),
        other => other.to_display_string(),
    }
}

fn object_tree(item: &DataItem, ignore_nulls: bool) -> Map<String, Json> {
    let mut map = Map::with_capacity(item.len());
    for (name, value) in item.iter() {
        if ignore_nulls && value.is_null() {
            continue;
        }
        map.insert(name.to_string(), value_tree(value, ignore_nulls));
    }
    map
}

fn value_tree(value: &Value, ignore_nulls: bool) -> Json {
    match value {
        Value::Item(child) => Json::Object(object_tree(child, ignore_nulls)),
        // Null elements stay: suppression is for object fields only.
        Value::Array(items) => Json::Array(
            items
                .iter()
                .map(|element| value_tree(element, ignore_nulls))
                .collect(),
        ),
        scalar => scalar.to_json(),
    }
}
