//! Property fields and values referenced by conditions.
//!
//! Property values are owned by the run; the engine only reads them.
//! A value is an opaque typed JSON literal (string, number, boolean,
//! or array) compared structurally by the evaluator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::PropertyFieldId;

/// Display metadata for a property field, used when rendering a
/// condition as human-readable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyField {
    pub id: PropertyFieldId,
    pub name: String,
}

impl PropertyField {
    pub fn new(id: PropertyFieldId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// The keyed property values attached to a run.
///
/// A stored JSON `null` is indistinguishable from an absent value: both
/// make `Is` evaluate false and `IsNot` evaluate true.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyValues(HashMap<PropertyFieldId, Value>);

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for a field, treating stored nulls as absent.
    pub fn get(&self, field_id: PropertyFieldId) -> Option<&Value> {
        match self.0.get(&field_id) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    /// Sets a field's value. Returns true if the stored value actually
    /// changed, so callers know whether a re-evaluation fan-out is due.
    pub fn set(&mut self, field_id: PropertyFieldId, value: Value) -> bool {
        match self.0.get(&field_id) {
            Some(existing) if *existing == value => false,
            _ => {
                self.0.insert(field_id, value);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyFieldId, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(PropertyFieldId, Value)> for PropertyValues {
    fn from_iter<T: IntoIterator<Item = (PropertyFieldId, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
