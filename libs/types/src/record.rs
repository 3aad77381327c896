//! Ordered field records (array elements)

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Shared field name; cloned into every emitted record without reallocating
pub type FieldName = Arc<str>;

/// Fields of one array element, in schema order
///
/// Lookups are linear: element schemas are small and the order matters more
/// than lookup speed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record {
    fields: Vec<(FieldName, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Append a field; a repeated name shadows the earlier entry on lookup
    pub fn push(&mut self, name: impl Into<FieldName>, value: Value) {
        self.fields.push((name.into(), value));
    }

    /// Latest value recorded under `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .rev()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_ref(), v))
    }

    /// Remove all fields, keeping the allocation for the next element
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Move the fields out, leaving an empty record with no capacity
    pub fn take(&mut self) -> Record {
        std::mem::take(self)
    }

    pub fn into_fields(self) -> Vec<(FieldName, Value)> {
        self.fields
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

impl<N: Into<FieldName>> FromIterator<(N, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (N, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }
}
