//! # Schema Builder
//!
//! ## Purpose
//!
//! Fluent, append-only declaration of a binary record. Every call appends one
//! field primitive (or a control combinator) and hands the builder back; the
//! first mistake is kept and reported by [`SchemaBuilder::compile`], so a
//! declaration reads top to bottom without a `?` per field.
//!
//! ## Scoping Rules
//!
//! - names must match `[A-Za-z_][A-Za-z0-9_]*` and avoid reserved words
//! - `when` / `switch` bodies share the enclosing scope; array elements get their own
//! - references (lengths, counts, mask sources, tags, computed inputs) must name
//!   a field declared earlier in scope; lengths, counts and masks need integers
//!
//! ## Example
//!
//! ```
//! use codec::{Len, SchemaBuilder};
//!
//! let schema = SchemaBuilder::new()
//!     .uint8("kind")
//!     .uint16("len").internal()
//!     .bytes_dyn("payload", "len")
//!     .when("kind", 2, |b| b.uuid("session"))
//!     .uint8("count").internal()
//!     .array("items", Len::Field("count"), |e| e.uint32("id").text("code", 3))
//!     .compile()
//!     .unwrap();
//! assert_eq!(
//!     schema.fields().collect::<Vec<_>>(),
//!     vec!["kind", "payload", "session", "items"]
//! );
//! ```

pub(crate) mod ir;
pub(crate) mod names;
pub(crate) mod switch;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use types::{Value, ValueKind};

use crate::compiler::program::{Program, SlotMeta};
use crate::compiler::step::{Length, PointerId, SlotId, Step};
use crate::compiler;
use crate::compiler::analysis::min_record_bytes;
use crate::config::EngineConfig;
use crate::error::{SchemaError, SchemaResult};
use crate::primitives::array::{self, ArrayElement};
use crate::primitives::buffer::{self, BufferForm};
use crate::primitives::derived::{self, ComputeFn};
use crate::primitives::fixed::{self, Decode, UUID_WIDTH};
use crate::primitives::control;
use crate::runtime::CompiledSchema;
use ir::{GuardSpec, Item};
pub use switch::SwitchBuilder;
use switch::{Branch, Otherwise};

/// Identity of each builder, so a branch body cannot swap in another one
static NEXT_BUILDER_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Element count of an array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Len<'a> {
    /// Known when the schema is declared
    Fixed(usize),
    /// Read from an earlier integer field
    Field(&'a str),
}

/// Fluent schema declaration
#[must_use]
pub struct SchemaBuilder {
    token: u64,
    config: EngineConfig,
    items: Vec<Item>,
    guards: Vec<GuardSpec>,
    slots: Vec<SlotMeta>,
    pointers: u32,
    /// Slot of the most recently appended named step, target of modifiers
    last_slot: Option<SlotId>,
    error: Option<SchemaError>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            token: NEXT_BUILDER_TOKEN.fetch_add(1, Ordering::Relaxed),
            config,
            items: Vec::new(),
            guards: Vec::new(),
            slots: Vec::new(),
            pointers: 0,
            last_slot: None,
            error: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Unsigned little-endian integer of `width` bytes (1-8)
    pub fn uint(self, name: &str, width: usize) -> Self {
        self.apply(|b| b.push_integer(name, "uint", width, Decode::UInt))
    }

    pub fn uint8(self, name: &str) -> Self {
        self.uint(name, 1)
    }

    pub fn uint16(self, name: &str) -> Self {
        self.uint(name, 2)
    }

    pub fn uint32(self, name: &str) -> Self {
        self.uint(name, 4)
    }

    pub fn uint64(self, name: &str) -> Self {
        self.uint(name, 8)
    }

    /// Two's complement little-endian integer of `width` bytes (1-8)
    pub fn int(self, name: &str, width: usize) -> Self {
        self.apply(|b| b.push_integer(name, "int", width, Decode::Int))
    }

    pub fn int8(self, name: &str) -> Self {
        self.int(name, 1)
    }

    pub fn int16(self, name: &str) -> Self {
        self.int(name, 2)
    }

    pub fn int32(self, name: &str) -> Self {
        self.int(name, 4)
    }

    pub fn int64(self, name: &str) -> Self {
        self.int(name, 8)
    }

    /// 128-bit identifier, 16 raw bytes in RFC 4122 order
    pub fn uuid(self, name: &str) -> Self {
        self.apply(|b| {
            let slot = b.declare(name, Value::Empty, true, Some(ValueKind::Uuid))?;
            let step = fixed::step(name, "uuid".into(), slot, UUID_WIDTH, Decode::Uuid);
            b.push(step, Some(slot));
            Ok(())
        })
    }

    /// 128-bit identifier delivered as hyphenated lower-case hex text
    pub fn uuid_text(self, name: &str) -> Self {
        self.apply(|b| {
            let slot = b.declare(name, Value::Empty, true, Some(ValueKind::Text))?;
            let step = fixed::step(name, "uuid_text".into(), slot, UUID_WIDTH, Decode::UuidText);
            b.push(step, Some(slot));
            Ok(())
        })
    }

    /// `len` raw bytes
    pub fn bytes(self, name: &str, len: usize) -> Self {
        self.apply(|b| b.push_buffer(name, Len::Fixed(len), BufferForm::Bytes))
    }

    /// Raw bytes whose length is the value of an earlier field
    pub fn bytes_dyn(self, name: &str, len_field: &str) -> Self {
        self.apply(|b| b.push_buffer(name, Len::Field(len_field), BufferForm::Bytes))
    }

    /// `len` bytes of UTF-8 text
    pub fn text(self, name: &str, len: usize) -> Self {
        self.apply(|b| b.push_buffer(name, Len::Fixed(len), BufferForm::Text))
    }

    /// UTF-8 text whose byte length is the value of an earlier field
    pub fn text_dyn(self, name: &str, len_field: &str) -> Self {
        self.apply(|b| b.push_buffer(name, Len::Field(len_field), BufferForm::Text))
    }

    /// Value fixed at declaration time; consumes no bytes
    pub fn constant(self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.apply(|b| {
            let slot = b.declare(name, value.clone(), false, Some(value.kind()))?;
            b.push(derived::constant_step(name, slot, value), Some(slot));
            Ok(())
        })
    }

    /// `source & mask` of an earlier integer field
    pub fn mask(self, name: &str, source: &str, mask: u64) -> Self {
        self.apply(|b| b.push_mask(name, source, mask, false))
    }

    /// Whether any bit of `mask` is set in an earlier integer field
    pub fn flag(self, name: &str, source: &str, mask: u64) -> Self {
        self.apply(|b| b.push_mask(name, source, mask, true))
    }

    /// Value computed from earlier fields, passed in the order of `deps`
    pub fn computed<F>(self, name: &str, deps: &[&str], func: F) -> Self
    where
        F: Fn(&[&Value]) -> Value + Send + Sync + 'static,
    {
        self.apply(|b| {
            let referenced_by = format!("computed({name})");
            let deps = deps
                .iter()
                .map(|dep| b.resolve(dep, &referenced_by, false))
                .collect::<SchemaResult<Vec<_>>>()?;
            let slot = b.declare(name, Value::Empty, true, None)?;
            let step = derived::computed_step(name, slot, deps, ComputeFn::new(func));
            b.push(step, Some(slot));
            Ok(())
        })
    }

    /// Reaching this step is a parse error
    pub fn fail(self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.apply(|b| {
            b.push_fail(reason);
            Ok(())
        })
    }

    /// Terminate the schema: later fields are never read and the parser halts
    pub fn end(self) -> Self {
        self.apply(|b| {
            let label = b.generated_label("end");
            b.push(derived::end_step(label), None);
            Ok(())
        })
    }

    /// Read `body` only when the tag field equals `value`
    pub fn when(mut self, tag: &str, value: impl Into<Value>, body: impl FnOnce(Self) -> Self) -> Self {
        if self.error.is_some() {
            return self;
        }
        let guard = match self.open_guard(tag, value.into(), "when") {
            Ok(guard) => guard,
            Err(err) => return self.failed(err),
        };
        let mut builder = self.branch(body);
        if builder.error.is_none() {
            builder.close_guard(guard);
        }
        builder
    }

    /// Dispatch on a tag field
    ///
    /// ```
    /// use codec::SchemaBuilder;
    ///
    /// let schema = SchemaBuilder::new()
    ///     .uint8("op").internal()
    ///     .switch("op", |s| {
    ///         s.case(1, |b| b.uint32("read_at"))
    ///             .case(2, |b| b.uint32("write_at").uint16("write_len"))
    ///             .otherwise_fail("unknown opcode")
    ///     })
    ///     .compile();
    /// assert!(schema.is_ok());
    /// ```
    pub fn switch<'a>(
        mut self,
        tag: &str,
        cases: impl FnOnce(SwitchBuilder<'a>) -> SwitchBuilder<'a>,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }
        let SwitchBuilder { cases, otherwise } = cases(SwitchBuilder::new());
        if let Err(err) = check_cases(tag, &cases, otherwise.is_some()) {
            return self.failed(err);
        }

        let exit = self.new_pointer();
        for (value, body) in cases {
            let guard = match self.open_guard(tag, value, "switch") {
                Ok(guard) => guard,
                Err(err) => return self.failed(err),
            };
            self = self.branch(body);
            if self.error.is_some() {
                return self;
            }
            let label = self.generated_label("jump");
            self.push(control::jump_step(label, exit), None);
            self.close_guard(guard);
        }

        match otherwise {
            Some(Otherwise::Branch(body)) => {
                self = self.branch(body);
                if self.error.is_some() {
                    return self;
                }
            }
            Some(Otherwise::Fail(reason)) => self.push_fail(reason),
            None => {}
        }
        self.place_pointer(exit);
        self
    }

    /// Collect `count` elements and deliver them as one list after the last
    pub fn array(self, name: &str, count: Len<'_>, element: impl FnOnce(Self) -> Self) -> Self {
        self.push_array(name, count, element, false)
    }

    /// Deliver each of `count` elements as a record as soon as it completes
    pub fn array_continuous(
        self,
        name: &str,
        count: Len<'_>,
        element: impl FnOnce(Self) -> Self,
    ) -> Self {
        self.push_array(name, count, element, true)
    }

    /// Keep the last field out of callbacks; later steps can still read it
    pub fn internal(self) -> Self {
        self.apply(|b| {
            let slot = b.last_slot.ok_or(SchemaError::NoStepToModify {
                modifier: "internal",
            })?;
            b.slots[slot].internal = true;
            Ok(())
        })
    }

    /// Keep the last field's value across records instead of clearing it
    pub fn persistent(self) -> Self {
        self.apply(|b| {
            let slot = b.last_slot.ok_or(SchemaError::NoStepToModify {
                modifier: "persistent",
            })?;
            b.slots[slot].reset = false;
            Ok(())
        })
    }

    /// Check and compile the declaration
    ///
    /// A schema that could finish a record without reading a byte is rejected.
    pub fn compile(self) -> SchemaResult<CompiledSchema> {
        let program = self.into_program()?;
        if !program.steps.is_empty() && min_record_bytes(&program, false) == Some(0) {
            return Err(SchemaError::EmptyRecord);
        }
        Ok(CompiledSchema::new(program))
    }

    fn into_program(self) -> SchemaResult<Program> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let steps = ir::relocate(self.items, self.guards)?;
        compiler::compile(steps, self.slots, self.pointers as usize, self.config)
    }

    fn apply(mut self, f: impl FnOnce(&mut Self) -> SchemaResult<()>) -> Self {
        if self.error.is_none() {
            if let Err(err) = f(&mut self) {
                self.error = Some(err);
            }
        }
        self
    }

    fn failed(mut self, err: SchemaError) -> Self {
        self.error.get_or_insert(err);
        self
    }

    /// Run a branch body on this builder and make sure it comes back
    fn branch(self, body: impl FnOnce(Self) -> Self) -> Self {
        let token = self.token;
        let builder = body(self);
        if builder.token != token {
            return builder.failed(SchemaError::DetachedBranch);
        }
        builder
    }

    fn declare(
        &mut self,
        name: &str,
        initial: Value,
        reset: bool,
        kind: Option<ValueKind>,
    ) -> SchemaResult<SlotId> {
        names::check(name)?;
        if self.slots.iter().any(|slot| slot.name.as_ref() == name) {
            return Err(SchemaError::DuplicateName {
                name: name.to_string(),
            });
        }
        self.slots.push(SlotMeta::new(name, initial, reset, kind));
        Ok(self.slots.len() - 1)
    }

    /// Earlier field referenced by `referenced_by`
    fn resolve(&self, name: &str, referenced_by: &str, integer: bool) -> SchemaResult<SlotId> {
        let slot = self
            .slots
            .iter()
            .position(|slot| slot.name.as_ref() == name)
            .ok_or_else(|| SchemaError::unknown_field(name, referenced_by))?;
        match self.slots[slot].kind {
            Some(kind) if integer && !kind.is_integer() => {
                Err(SchemaError::field_kind(name, kind, referenced_by))
            }
            _ => Ok(slot),
        }
    }

    fn push(&mut self, step: Step, slot: Option<SlotId>) {
        self.items.push(Item::Step(step));
        self.last_slot = slot;
    }

    fn generated_label(&self, kind: &str) -> String {
        format!("{kind}#{}", self.items.len())
    }

    fn push_integer(
        &mut self,
        name: &str,
        primitive: &str,
        width: usize,
        decode: Decode,
    ) -> SchemaResult<()> {
        if !(1..=8).contains(&width) {
            return Err(SchemaError::InvalidWidth {
                name: name.to_string(),
                width,
            });
        }
        let kind = match decode {
            Decode::Int => ValueKind::Int,
            _ => ValueKind::UInt,
        };
        let slot = self.declare(name, Value::Empty, true, Some(kind))?;
        let step = fixed::step(name, format!("{primitive}({width})"), slot, width as u8, decode);
        self.push(step, Some(slot));
        Ok(())
    }

    fn push_buffer(&mut self, name: &str, len: Len<'_>, form: BufferForm) -> SchemaResult<()> {
        let base = match form {
            BufferForm::Bytes => "bytes",
            BufferForm::Text => "text",
        };
        let (len, primitive) = match len {
            Len::Fixed(n) => (Length::Fixed(n), format!("{base}({n})")),
            Len::Field(field) => {
                let referenced_by = format!("{base}_dyn({name})");
                let source = self.resolve(field, &referenced_by, true)?;
                (Length::Slot(source), format!("{base}_dyn({field})"))
            }
        };
        let kind = match form {
            BufferForm::Bytes => ValueKind::Bytes,
            BufferForm::Text => ValueKind::Text,
        };
        let slot = self.declare(name, Value::Empty, true, Some(kind))?;
        self.push(buffer::step(name, primitive, slot, len, form), Some(slot));
        Ok(())
    }

    fn push_mask(&mut self, name: &str, source: &str, mask: u64, flag: bool) -> SchemaResult<()> {
        let primitive = if flag { "flag" } else { "mask" };
        let source = self.resolve(source, &format!("{primitive}({name})"), true)?;
        let kind = if flag { ValueKind::Bool } else { ValueKind::UInt };
        let slot = self.declare(name, Value::Empty, true, Some(kind))?;
        self.push(derived::mask_step(name, slot, source, mask, flag), Some(slot));
        Ok(())
    }

    fn push_fail(&mut self, reason: String) {
        let label = self.generated_label("fail");
        self.push(derived::fail_step(label, reason), None);
    }

    fn push_array(
        mut self,
        name: &str,
        count: Len<'_>,
        element: impl FnOnce(Self) -> Self,
        continuous: bool,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }
        let primitive = if continuous { "array_continuous" } else { "array" };
        let count = match count {
            Len::Fixed(n) => Length::Fixed(n),
            Len::Field(field) => match self.resolve(field, &format!("{primitive}({name})"), true) {
                Ok(source) => Length::Slot(source),
                Err(err) => return self.failed(err),
            },
        };
        let kind = if continuous {
            ValueKind::Record
        } else {
            ValueKind::List
        };
        let slot = match self.declare(name, Value::Empty, true, Some(kind)) {
            Ok(slot) => slot,
            Err(err) => return self.failed(err),
        };

        // Elements get a scope and resume-id space of their own
        let scope = SchemaBuilder::with_config(self.config.clone());
        let token = scope.token;
        let built = element(scope);
        if built.token != token {
            return self.failed(SchemaError::DetachedBranch);
        }
        let program = match built.into_program() {
            Ok(program) => program,
            Err(err) => return self.failed(err),
        };

        let spec = Arc::new(ArrayElement {
            program,
            continuous,
        });
        self.push(array::step(name, slot, count, spec), Some(slot));
        self
    }

    fn open_guard(&mut self, tag: &str, expected: Value, combinator: &str) -> SchemaResult<usize> {
        let tag = self.resolve(tag, &format!("{combinator}({expected})"), false)?;
        let label = self.generated_label(combinator);
        self.guards.push(GuardSpec {
            label,
            tag,
            expected,
            else_to: None,
        });
        let guard = self.guards.len() - 1;
        self.items.push(Item::Placeholder(guard));
        self.last_slot = None;
        Ok(guard)
    }

    /// Place the guard's else-target after everything appended since it opened
    fn close_guard(&mut self, guard: usize) {
        let pointer = self.new_pointer();
        self.guards[guard].else_to = Some(pointer);
        self.place_pointer(pointer);
    }

    fn new_pointer(&mut self) -> PointerId {
        let pointer = PointerId(self.pointers);
        self.pointers += 1;
        pointer
    }

    fn place_pointer(&mut self, pointer: PointerId) {
        self.push(control::pointer_step(pointer), None);
    }
}

fn check_cases(tag: &str, cases: &[(Value, Branch<'_>)], guarded: bool) -> SchemaResult<()> {
    if cases.is_empty() {
        return Err(SchemaError::EmptyDispatch {
            tag: tag.to_string(),
        });
    }
    for (index, (value, _)) in cases.iter().enumerate() {
        if cases[..index]
            .iter()
            .any(|(earlier, _)| control::matches(earlier, value))
        {
            return Err(SchemaError::DuplicateCase {
                tag: tag.to_string(),
                value: value.to_string(),
            });
        }
    }
    if !guarded {
        return Err(SchemaError::UnguardedDispatch {
            tag: tag.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_of(builder: SchemaBuilder) -> SchemaError {
        match builder.compile() {
            Ok(_) => panic!("schema should not compile"),
            Err(err) => err,
        }
    }

    #[test]
    fn test_duplicate_and_invalid_names() {
        let err = error_of(SchemaBuilder::new().uint8("a").uint16("a"));
        assert_eq!(err, SchemaError::DuplicateName { name: "a".into() });

        let err = error_of(SchemaBuilder::new().uint8("9lives"));
        assert!(matches!(err, SchemaError::InvalidName { .. }));

        let err = error_of(SchemaBuilder::new().uint8("match"));
        assert!(matches!(err, SchemaError::ReservedName { .. }));
    }

    #[test]
    fn test_branch_shares_enclosing_scope() {
        let err = error_of(
            SchemaBuilder::new()
                .uint8("tag")
                .uint8("x")
                .when("tag", 1, |b| b.uint8("x")),
        );
        assert_eq!(err, SchemaError::DuplicateName { name: "x".into() });
    }

    #[test]
    fn test_array_element_has_own_scope() {
        let schema = SchemaBuilder::new()
            .uint8("id")
            .array("items", Len::Fixed(2), |e| e.uint8("id"))
            .compile();
        assert!(schema.is_ok());

        // The element cannot see the enclosing fields
        let err = error_of(
            SchemaBuilder::new()
                .uint8("n")
                .array("items", Len::Fixed(1), |e| e.bytes_dyn("data", "n")),
        );
        assert!(matches!(err, SchemaError::UnknownField { .. }));
    }

    #[test]
    fn test_references_must_be_earlier_integers() {
        let err = error_of(SchemaBuilder::new().bytes_dyn("data", "len").uint8("len"));
        assert_eq!(err, SchemaError::unknown_field("len", "bytes_dyn(data)"));

        let err = error_of(SchemaBuilder::new().text("name", 4).bytes_dyn("data", "name"));
        assert_eq!(
            err,
            SchemaError::field_kind("name", ValueKind::Text, "bytes_dyn(data)")
        );

        let err = error_of(SchemaBuilder::new().uuid("id").flag("bit", "id", 1));
        assert!(matches!(err, SchemaError::FieldKind { .. }));
    }

    #[test]
    fn test_width_bounds() {
        let err = error_of(SchemaBuilder::new().uint("wide", 9));
        assert_eq!(
            err,
            SchemaError::InvalidWidth {
                name: "wide".into(),
                width: 9
            }
        );
        assert!(SchemaBuilder::new().int("zero", 0).compile().is_err());
    }

    #[test]
    fn test_modifiers_need_a_named_step() {
        let err = error_of(SchemaBuilder::new().internal());
        assert_eq!(
            err,
            SchemaError::NoStepToModify {
                modifier: "internal"
            }
        );

        let err = error_of(SchemaBuilder::new().uint8("t").when("t", 1, |b| b).persistent());
        assert!(matches!(err, SchemaError::NoStepToModify { .. }));
    }

    #[test]
    fn test_first_error_wins() {
        let err = error_of(SchemaBuilder::new().uint8("if").uint8("a").uint8("a"));
        assert!(matches!(err, SchemaError::ReservedName { .. }));
    }

    #[test]
    fn test_switch_must_be_exhaustive() {
        let err = error_of(
            SchemaBuilder::new()
                .uint8("op")
                .switch("op", |s| s.case(1, |b| b.uint8("x"))),
        );
        assert_eq!(err, SchemaError::UnguardedDispatch { tag: "op".into() });

        let err = error_of(SchemaBuilder::new().uint8("op").switch("op", |s| s.otherwise_fail("no")));
        assert_eq!(err, SchemaError::EmptyDispatch { tag: "op".into() });

        let err = error_of(SchemaBuilder::new().uint8("op").switch("op", |s| {
            s.case(1u8, |b| b.uint8("x"))
                .case(1u64, |b| b.uint8("y"))
                .otherwise_fail("no")
        }));
        assert!(matches!(err, SchemaError::DuplicateCase { .. }));
    }

    #[test]
    fn test_branch_must_return_its_builder() {
        let err = error_of(
            SchemaBuilder::new()
                .uint8("t")
                .when("t", 1, |_| SchemaBuilder::new().uint8("x")),
        );
        assert_eq!(err, SchemaError::DetachedBranch);
    }

    #[test]
    fn test_pointer_ids_sit_above_sequential_ids() {
        let schema = SchemaBuilder::new()
            .uint8("t")
            .when("t", 1, |b| b.uint8("x"))
            .compile()
            .unwrap();
        let table = schema.to_string();
        assert!(table.contains("#2147483648"), "{table}");
        assert!(table.contains("when#1"), "{table}");
    }

    #[test]
    fn test_small_pointer_base_exhausts_ids() {
        let config = EngineConfig {
            pointer_id_base: 3,
            ..EngineConfig::default()
        };
        let err = error_of(
            SchemaBuilder::with_config(config)
                .uint8("a")
                .uint8("b")
                .uint8("c"),
        );
        assert!(matches!(err, SchemaError::ResumeIdSpaceExhausted { .. }));
    }
}
