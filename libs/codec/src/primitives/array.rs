//! Repeated sub-records
//!
//! The element schema is compiled on its own and driven by a private
//! [`ParseContext`] owned by the array step. Element fields are collected into
//! an accumulator record that is taken whole when the element completes, so
//! nothing from one element is visible in the next.
//!
//! - continuous: every element is emitted as [`Value::Record`] as soon as it completes
//! - collected: elements are emitted once, as [`Value::List`], after the last one

use std::sync::Arc;

use types::{Record, Value};

use crate::compiler::program::Program;
use crate::compiler::step::{Kernel, Length, SlotId, Step, RESUME};
use crate::error::{ParseError, ParseResult};
use crate::runtime::context::{Local, ParseContext};
use crate::runtime::engine::{Flow, Machine, Outcome};
use crate::runtime::sink::{FieldRef, Sink};

/// Element slots reserved up front; counts come off the wire and are not trusted
const MAX_PREALLOCATED_ELEMENTS: usize = 1024;

/// Compiled element schema shared by both array snippets
pub(crate) type ArraySpec = Arc<ArrayElement>;

pub(crate) struct ArrayElement {
    pub program: Program,
    pub continuous: bool,
}

/// Progress of an array across suspensions
pub(crate) struct ArrayState {
    ctx: ParseContext,
    current: Record,
    collected: Vec<Record>,
    remaining: usize,
}

impl ArrayState {
    fn new(element: &ArrayElement, count: usize) -> Self {
        Self {
            ctx: ParseContext::new(&element.program),
            current: Record::new(),
            collected: if element.continuous {
                Vec::new()
            } else {
                Vec::with_capacity(count.min(MAX_PREALLOCATED_ELEMENTS))
            },
            remaining: count,
        }
    }
}

/// Collects exposed element fields into the element record
struct Accumulator<'a> {
    record: &'a mut Record,
}

impl Sink for Accumulator<'_> {
    fn field(&mut self, field: FieldRef<'_>, value: &Value) {
        self.record.push(field.name.clone(), value.clone());
    }
}

pub(crate) fn step(label: &str, slot: SlotId, count: Length, spec: ArraySpec) -> Step {
    let primitive = if spec.continuous {
        "array_continuous"
    } else {
        "array"
    };
    Step::new(label, primitive)
        .local("elements")
        .snippet(
            "entry",
            Kernel::ArrayEntry {
                slot,
                count,
                spec: spec.clone(),
            },
        )
        .snippet("loop", Kernel::ArrayLoop { slot, spec })
}

pub(crate) fn exec_entry(
    m: &mut Machine<'_, '_>,
    slot: SlotId,
    count: Length,
    spec: &ArraySpec,
) -> ParseResult<Flow> {
    let count = m.length(count)?;
    if count == 0 {
        if !spec.continuous {
            m.set(slot, Value::List(Vec::new()));
        }
        return Ok(Flow::Continue);
    }
    *m.local() = Local::Array(Box::new(ArrayState::new(spec, count)));
    Ok(Flow::Go(RESUME))
}

pub(crate) fn exec_loop(m: &mut Machine<'_, '_>, slot: SlotId, spec: &ArraySpec) -> ParseResult<Flow> {
    let Local::Array(mut state) = m.take_local() else {
        return Err(ParseError::unreachable(
            m.label(),
            "array resumed without element state",
        ));
    };

    let flow = drive(m, slot, spec, &mut state);
    // Suspended or failed elements keep their private context for the next read
    if !matches!(flow, Ok(Flow::Continue)) {
        m.put_local(Local::Array(state));
    }
    flow
}

fn drive(
    m: &mut Machine<'_, '_>,
    slot: SlotId,
    spec: &ArrayElement,
    state: &mut ArrayState,
) -> ParseResult<Flow> {
    loop {
        let outcome = {
            let mut sink = Accumulator {
                record: &mut state.current,
            };
            Machine::new(&spec.program, &mut state.ctx, &mut *m.cursor, &mut sink).run()?
        };

        match outcome {
            Outcome::Suspended => return Ok(Flow::Escape),
            Outcome::Halted => state.ctx.restart(&spec.program),
            Outcome::Completed => {}
        }

        let element = state.current.take();
        state.remaining -= 1;
        if spec.continuous {
            m.set(slot, Value::Record(element));
        } else {
            state.collected.push(element);
        }

        if state.remaining == 0 {
            if !spec.continuous {
                m.set(slot, Value::List(std::mem::take(&mut state.collected)));
            }
            return Ok(Flow::Continue);
        }
    }
}
