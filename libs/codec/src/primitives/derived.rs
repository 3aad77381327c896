//! Zero-byte fields and terminal steps
//!
//! Constants, masks, flags and computed values derive their value from the
//! schema or from fields already read; `fail` and `end` stop the record.

use std::fmt;
use std::sync::Arc;

use tracing::warn;
use types::Value;

use crate::compiler::step::{Kernel, SlotId, Step};
use crate::error::{ParseError, ParseResult};
use crate::runtime::engine::{Flow, Machine};

/// User function computing a field from earlier values, in declaration order
#[derive(Clone)]
pub(crate) struct ComputeFn(Arc<dyn Fn(&[&Value]) -> Value + Send + Sync>);

impl ComputeFn {
    pub(crate) fn new(func: impl Fn(&[&Value]) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(func))
    }
}

impl fmt::Debug for ComputeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ComputeFn")
    }
}

pub(crate) fn constant_step(label: &str, slot: SlotId, value: Value) -> Step {
    Step::new(label, format!("constant({value})")).snippet("entry", Kernel::Const { slot, value })
}

pub(crate) fn mask_step(label: &str, slot: SlotId, source: SlotId, mask: u64, flag: bool) -> Step {
    let primitive = if flag { "flag" } else { "mask" };
    Step::new(label, format!("{primitive}({mask:#x})")).snippet(
        "entry",
        Kernel::Mask {
            slot,
            source,
            mask,
            flag,
        },
    )
}

pub(crate) fn computed_step(label: &str, slot: SlotId, deps: Vec<SlotId>, func: ComputeFn) -> Step {
    Step::new(label, "computed").snippet("entry", Kernel::Computed { slot, deps, func })
}

pub(crate) fn fail_step(label: String, reason: String) -> Step {
    Step::new(label, "fail").snippet("entry", Kernel::Fail { reason })
}

pub(crate) fn end_step(label: String) -> Step {
    Step::new(label, "end").snippet("entry", Kernel::End)
}

pub(crate) fn exec_const(m: &mut Machine<'_, '_>, slot: SlotId, value: &Value) -> ParseResult<Flow> {
    m.set(slot, value.clone());
    Ok(Flow::Continue)
}

/// `source & mask`, or a boolean of it for flags
///
/// A source skipped by a conditional is still [`Value::Empty`]; the derived
/// value stays empty too.
pub(crate) fn exec_mask(
    m: &mut Machine<'_, '_>,
    slot: SlotId,
    source: SlotId,
    mask: u64,
    flag: bool,
) -> ParseResult<Flow> {
    let value = match m.integer(source)? {
        None => Value::Empty,
        Some(bits) if flag => Value::Bool(bits & mask != 0),
        Some(bits) => Value::UInt(bits & mask),
    };
    m.set(slot, value);
    Ok(Flow::Continue)
}

pub(crate) fn exec_computed(
    m: &mut Machine<'_, '_>,
    slot: SlotId,
    deps: &[SlotId],
    func: &ComputeFn,
) -> ParseResult<Flow> {
    let value = {
        let inputs: Vec<&Value> = deps.iter().map(|&dep| m.value(dep)).collect();
        (func.0)(&inputs)
    };
    m.set(slot, value);
    Ok(Flow::Continue)
}

pub(crate) fn exec_fail(m: &mut Machine<'_, '_>, reason: &str) -> ParseResult<Flow> {
    let step = m.label();
    warn!(step, reason, "fail guard reached");
    Err(ParseError::unreachable(step, reason))
}
