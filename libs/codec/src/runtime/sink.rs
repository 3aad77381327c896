//! Field and record-boundary delivery
//!
//! The engine reports every finalized exposed field, in schema order, through
//! a [`Sink`]. Implement the trait directly for a typed consumer, or use
//! [`Callbacks`] for a table of closures keyed by field name.

use std::fmt;

use types::{FieldName, Value};

use crate::compiler::program::Program;
use crate::error::{SchemaError, SchemaResult};

/// Exposed field being delivered
#[derive(Debug, Clone, Copy)]
pub struct FieldRef<'a> {
    /// Dense index among the schema's exposed fields, see
    /// [`CompiledSchema::fields`](crate::CompiledSchema::fields)
    pub index: usize,
    pub name: &'a FieldName,
}

/// Receiver of parse events
pub trait Sink {
    /// A field value was finalized
    fn field(&mut self, field: FieldRef<'_>, value: &Value);

    /// Execution returned to the first step: one record is complete
    fn record_end(&mut self) {}
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn field(&mut self, field: FieldRef<'_>, value: &Value) {
        (**self).field(field, value)
    }

    fn record_end(&mut self) {
        (**self).record_end()
    }
}

type FieldCallback = Box<dyn FnMut(&Value)>;
type RecordCallback = Box<dyn FnMut()>;

/// Callback table keyed by exposed field name
///
/// ```
/// use codec::{Callbacks, SchemaBuilder};
///
/// let schema = SchemaBuilder::new().uint8("kind").compile().unwrap();
/// let parser = schema
///     .parser_with_callbacks(Callbacks::new().on("kind", |v| println!("kind = {v}")))
///     .unwrap();
/// # drop(parser);
/// ```
#[derive(Default)]
pub struct Callbacks {
    fields: Vec<(String, FieldCallback)>,
    record_end: Option<RecordCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `callback` with every value of `name`; registering a name again replaces it
    pub fn on(mut self, name: impl Into<String>, callback: impl FnMut(&Value) + 'static) -> Self {
        self.fields.push((name.into(), Box::new(callback)));
        self
    }

    pub fn on_record_end(mut self, callback: impl FnMut() + 'static) -> Self {
        self.record_end = Some(Box::new(callback));
        self
    }

    /// Resolve names to exposed field indices
    pub(crate) fn bind(self, program: &Program) -> SchemaResult<BoundCallbacks> {
        let mut by_index: Vec<Option<FieldCallback>> =
            program.exposed.iter().map(|_| None).collect();
        for (name, callback) in self.fields {
            let index = program
                .slot_by_name(&name)
                .and_then(|(_, meta)| meta.exposed)
                .ok_or(SchemaError::UnknownCallback { name })?;
            by_index[index] = Some(callback);
        }
        Ok(BoundCallbacks {
            by_index,
            record_end: self.record_end,
        })
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("Callbacks")
            .field("fields", &names)
            .field("record_end", &self.record_end.is_some())
            .finish()
    }
}

/// [`Callbacks`] resolved against one compiled schema
pub struct BoundCallbacks {
    by_index: Vec<Option<FieldCallback>>,
    record_end: Option<RecordCallback>,
}

impl Sink for BoundCallbacks {
    fn field(&mut self, field: FieldRef<'_>, value: &Value) {
        if let Some(Some(callback)) = self.by_index.get_mut(field.index) {
            callback(value);
        }
    }

    fn record_end(&mut self) {
        if let Some(callback) = &mut self.record_end {
            callback();
        }
    }
}

impl fmt::Debug for BoundCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCallbacks")
            .field("bound", &self.by_index.iter().filter(|c| c.is_some()).count())
            .finish()
    }
}
