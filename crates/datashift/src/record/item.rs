//! The ordered record representation.

use serde_json::{Map, Value as Json};

use super::value::Value;

/// A single record: an ordered collection of uniquely-named fields.
///
/// Insertion order matters for serialization and is preserved. Setting a
/// field that already exists replaces its value in place, keeping the
/// original position. Lookup is linear — records are small and the common
/// access pattern is full iteration, the same trade the row/column vectors
/// in a database batch make.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataItem {
    fields: Vec<(String, Value)>,
}

impl DataItem {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Create an empty record with capacity for `n` fields.
    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        Self {
            fields: Vec::with_capacity(n),
        }
    }

    /// Set a field value. Replaces in place if the name already exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Get a field value by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get the first field whose name matches case-insensitively,
    /// returning the stored name alongside the value.
    #[must_use]
    pub fn get_ignore_case(&self, name: &str) -> Option<(&str, &Value)> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(n, v)| (n.as_str(), v))
    }

    /// Remove a field by exact name, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    /// Whether a field with this exact name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize to a JSON object in field order, per the canonical
    /// serialization contract on [`Value::to_json`].
    #[must_use]
    pub fn to_json(&self) -> Json {
        let mut map = Map::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.to_json());
        }
        Json::Object(map)
    }

    /// Build a record from a JSON object, narrowing numbers per
    /// [`Value::from_json`].
    #[must_use]
    pub fn from_json_object(map: &Map<String, Json>) -> Self {
        let mut item = DataItem::with_capacity(map.len());
        for (name, value) in map {
            item.set(name.clone(), Value::from_json(value));
        }
        item
    }
}

impl FromIterator<(String, Value)> for DataItem {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut item = DataItem::new();
        for (name, value) in iter {
            item.set(name, value);
        }
        item
    }
}
