//! Per-stream parse state
//!
//! A [`ParseContext`] holds the single resume id, the current value of every
//! step, and one local per step for state that must survive a suspension. It
//! is owned by exactly one [`Parser`](crate::Parser) (or by one array step for
//! its elements) and is never shared.

use std::mem;

use types::Value;

use crate::compiler::program::{Program, ResumeId};
use crate::primitives::array::ArrayState;
use crate::primitives::buffer::Fragments;
use crate::primitives::fixed::Scratch;

/// Step-local state kept across a suspension
#[derive(Default)]
pub(crate) enum Local {
    #[default]
    Idle,
    Scratch(Scratch),
    Fragments(Fragments),
    Array(Box<ArrayState>),
}

pub(crate) struct ParseContext {
    /// Program counter: where the next read resumes
    pub pc: ResumeId,
    pub values: Vec<Value>,
    pub locals: Vec<Local>,
}

impl ParseContext {
    pub(crate) fn new(program: &Program) -> Self {
        Self {
            pc: program.initial(),
            values: program.slots.iter().map(|slot| slot.initial.clone()).collect(),
            locals: program.steps.iter().map(|_| Local::Idle).collect(),
        }
    }

    /// Clear resettable values left over from the record that just ended
    pub(crate) fn sweep(&mut self, program: &Program) {
        for &slot in &program.resettable {
            self.values[slot] = program.slots[slot].initial.clone();
        }
    }

    /// Back to the first step with fresh record state; persistent values survive
    pub(crate) fn restart(&mut self, program: &Program) {
        self.sweep(program);
        for local in &mut self.locals {
            *local = Local::Idle;
        }
        self.pc = program.initial();
    }

    /// Back to the state of a freshly created context
    pub(crate) fn reset(&mut self, program: &Program) {
        *self = Self::new(program);
    }

    pub(crate) fn take_local(&mut self, step: usize) -> Local {
        mem::take(&mut self.locals[step])
    }
}
