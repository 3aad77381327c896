//! Conditional control steps: guards, pointers and jumps
//!
//! ```text
//! when(tag, 20, body):        switch(tag, 10 => a, 20 => b, otherwise c):
//!
//!   guard tag==20 else P0       guard tag==10 else P0
//!   body...                     a...; jump P2
//!   pointer P0                  pointer P0
//!                               guard tag==20 else P1
//!                               b...; jump P2
//!                               pointer P1
//!                               c...
//!                               pointer P2
//! ```

use types::Value;

use crate::compiler::step::{Kernel, PointerId, SlotId, Step};
use crate::error::ParseResult;
use crate::runtime::engine::{Flow, Machine};

/// Tag comparison: integers by numeric value regardless of signedness
pub(crate) fn matches(actual: &Value, expected: &Value) -> bool {
    match (integer(actual), integer(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => actual == expected,
    }
}

fn integer(value: &Value) -> Option<i128> {
    match value {
        Value::UInt(v) => Some(i128::from(*v)),
        Value::Int(v) => Some(i128::from(*v)),
        _ => None,
    }
}

pub(crate) fn guard_step(label: String, tag: SlotId, expected: Value, else_to: PointerId) -> Step {
    Step::new(label, format!("guard(=={expected})")).snippet(
        "entry",
        Kernel::Guard {
            tag,
            expected,
            else_to,
        },
    )
}

pub(crate) fn pointer_step(pointer: PointerId) -> Step {
    let mut step = Step::new(format!("P{}", pointer.0), "pointer").snippet("entry", Kernel::Pointer);
    step.pointer = Some(pointer);
    step
}

pub(crate) fn jump_step(label: String, to: PointerId) -> Step {
    Step::new(label, format!("jump(P{})", to.0)).snippet("entry", Kernel::Jump { to })
}

pub(crate) fn exec_guard(
    m: &mut Machine<'_, '_>,
    tag: SlotId,
    expected: &Value,
    else_to: PointerId,
) -> ParseResult<Flow> {
    if matches(m.value(tag), expected) {
        Ok(Flow::Continue)
    } else {
        Ok(Flow::Jump(else_to))
    }
}
