//! State-table interpreter
//!
//! ```text
//! pc ──locate──▶ (step, snippet) ──kernel──▶ Flow
//!                     ▲                        │
//!                     ├──── Go / Continue / Jump (tail iteration)
//!                     │                        │
//!  return Suspended ◀─┴─ Escape  (record escape_to in pc)
//!  return Completed ◀─── Continue past the last step (sweep, record_end)
//!  return Halted    ◀─── End (sweep, record_end, pc = halted)
//! ```
//!
//! Leaving a step by `Continue` or `Jump` clears the values whose last
//! consumer it is.

use tracing::{debug, trace};
use types::Value;

use crate::compiler::program::{Loc, Program, ResumeId};
use crate::compiler::step::{Kernel, Length, PointerId, SlotId, ENTRY};
use crate::config::EngineConfig;
use crate::error::{ParseError, ParseResult};
use crate::primitives::{array, buffer, control, derived, fixed};
use crate::runtime::context::{Local, ParseContext};
use crate::runtime::cursor::Cursor;
use crate::runtime::sink::{FieldRef, Sink};

/// What a kernel asks the engine to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Enter the next step
    Continue,
    /// Enter another snippet of the same step
    Go(usize),
    /// Enter a conditional pointer
    Jump(PointerId),
    /// Out of input: suspend until the next read
    Escape,
    /// Early end of the whole schema
    End,
}

/// Why a run returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Suspended,
    Completed,
    Halted,
}

/// One run of a program over one input range
pub(crate) struct Machine<'a, 'i> {
    pub(crate) program: &'a Program,
    pub(crate) ctx: &'a mut ParseContext,
    pub(crate) cursor: &'a mut Cursor<'i>,
    sink: &'a mut dyn Sink,
    step: usize,
}

impl<'a, 'i> Machine<'a, 'i> {
    pub(crate) fn new(
        program: &'a Program,
        ctx: &'a mut ParseContext,
        cursor: &'a mut Cursor<'i>,
        sink: &'a mut dyn Sink,
    ) -> Self {
        Self {
            program,
            ctx,
            cursor,
            sink,
            step: 0,
        }
    }

    /// Run from the recorded resume id until a suspension or a record boundary
    pub(crate) fn run(&mut self) -> ParseResult<Outcome> {
        let program = self.program;
        if program.steps.is_empty() {
            return Ok(Outcome::Completed);
        }
        if self.ctx.pc == ResumeId::HALTED {
            return Ok(Outcome::Halted);
        }
        let Some(mut loc) = program.locate(self.ctx.pc) else {
            return Err(ParseError::unreachable(
                format!("resume {}", self.ctx.pc),
                "resume id is not part of this schema",
            ));
        };

        loop {
            let step = &program.steps[loc.step];
            let snippet = &step.snippets[loc.snippet];
            self.step = loc.step;

            let flow = match self.exec(&snippet.kernel) {
                Ok(flow) => flow,
                Err(err) => {
                    // Park on the failing snippet: the next read reports the same error
                    if let Some(id) = snippet.resume {
                        self.ctx.pc = id;
                    }
                    return Err(err);
                }
            };

            match flow {
                Flow::Go(target) => loc.snippet = target,
                Flow::Escape => {
                    if snippet.records {
                        if let Some(id) = snippet.escape_to {
                            self.ctx.pc = id;
                        }
                    }
                    trace!(
                        step = %step.label,
                        resume = %self.ctx.pc,
                        offset = self.cursor.position(),
                        "suspended"
                    );
                    return Ok(Outcome::Suspended);
                }
                Flow::Continue => {
                    self.leave(loc.step);
                    if loc.step + 1 == program.steps.len() {
                        self.finish_record();
                        self.ctx.pc = program.initial();
                        return Ok(Outcome::Completed);
                    }
                    loc = Loc {
                        step: loc.step + 1,
                        snippet: ENTRY,
                    };
                }
                Flow::Jump(pointer) => {
                    self.leave(loc.step);
                    loc = program.pointer(pointer);
                }
                Flow::End => {
                    self.leave(loc.step);
                    self.finish_record();
                    self.ctx.pc = ResumeId::HALTED;
                    debug!(
                        step = %step.label,
                        offset = self.cursor.position(),
                        "early end, parser halted"
                    );
                    return Ok(Outcome::Halted);
                }
            }
        }
    }

    fn exec(&mut self, kernel: &'a Kernel) -> ParseResult<Flow> {
        match kernel {
            Kernel::FixedEntry {
                slot,
                width,
                decode,
            } => fixed::exec_entry(self, *slot, *width, *decode),
            Kernel::FixedResume {
                slot,
                width,
                decode,
            } => fixed::exec_resume(self, *slot, *width, *decode),
            Kernel::BufferEntry { slot, len, form } => buffer::exec_entry(self, *slot, *len, *form),
            Kernel::BufferResume { slot, form } => buffer::exec_resume(self, *slot, *form),
            Kernel::Const { slot, value } => derived::exec_const(self, *slot, value),
            Kernel::Mask {
                slot,
                source,
                mask,
                flag,
            } => derived::exec_mask(self, *slot, *source, *mask, *flag),
            Kernel::Computed { slot, deps, func } => {
                derived::exec_computed(self, *slot, deps, func)
            }
            Kernel::Guard {
                tag,
                expected,
                else_to,
            } => control::exec_guard(self, *tag, expected, *else_to),
            Kernel::Pointer => Ok(Flow::Continue),
            Kernel::Jump { to } => Ok(Flow::Jump(*to)),
            Kernel::Fail { reason } => derived::exec_fail(self, reason),
            Kernel::End => Ok(Flow::End),
            Kernel::ArrayEntry { slot, count, spec } => {
                array::exec_entry(self, *slot, *count, spec)
            }
            Kernel::ArrayLoop { slot, spec } => array::exec_loop(self, *slot, spec),
        }
    }

    /// Clear the values whose last consumer is `step`
    fn leave(&mut self, step: usize) {
        let program = self.program;
        for &slot in &program.steps[step].resets {
            self.ctx.values[slot] = program.slots[slot].initial.clone();
        }
    }

    fn finish_record(&mut self) {
        self.ctx.sweep(self.program);
        trace!(offset = self.cursor.position(), "record end");
        self.sink.record_end();
    }

    /// Store a step's value, delivering it first when the field is exposed
    pub(crate) fn set(&mut self, slot: SlotId, value: Value) {
        let meta = &self.program.slots[slot];
        if let Some(index) = meta.exposed {
            self.sink.field(
                FieldRef {
                    index,
                    name: &meta.name,
                },
                &value,
            );
        }
        self.ctx.values[slot] = value;
    }

    pub(crate) fn value(&self, slot: SlotId) -> &Value {
        &self.ctx.values[slot]
    }

    /// Integer held by `slot`, `None` while the field is still empty
    pub(crate) fn integer(&self, slot: SlotId) -> ParseResult<Option<u64>> {
        match self.value(slot) {
            Value::Empty => Ok(None),
            Value::UInt(v) => Ok(Some(*v)),
            Value::Int(v) => Ok(Some(*v as u64)),
            other => Err(ParseError::NotAnInteger {
                field: self.program.slots[slot].name.to_string(),
                found: other.kind(),
            }),
        }
    }

    /// Resolve a byte length or element count
    ///
    /// An empty source (skipped by a conditional) counts as zero; a negative
    /// signed source does not fit and is reported as an overflow.
    pub(crate) fn length(&self, len: Length) -> ParseResult<usize> {
        let slot = match len {
            Length::Fixed(n) => return Ok(n),
            Length::Slot(slot) => slot,
        };
        let overflow = |value: u64| ParseError::LengthOverflow {
            field: self.program.slots[slot].name.to_string(),
            value,
        };
        match self.value(slot) {
            Value::Int(v) if *v < 0 => Err(overflow(*v as u64)),
            _ => {
                let value = self.integer(slot)?.unwrap_or(0);
                usize::try_from(value).map_err(|_| overflow(value))
            }
        }
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.program.config
    }

    /// Label of the step being executed
    pub(crate) fn label(&self) -> &'a str {
        let program: &'a Program = self.program;
        &program.steps[self.step].label
    }

    pub(crate) fn local(&mut self) -> &mut Local {
        &mut self.ctx.locals[self.step]
    }

    pub(crate) fn take_local(&mut self) -> Local {
        self.ctx.take_local(self.step)
    }

    pub(crate) fn put_local(&mut self, local: Local) {
        self.ctx.locals[self.step] = local;
    }
}
