//! Flattened, resumable program
//!
//! ## Resume Identifier Layout
//!
//! ```text
//! 0                      halted (early end reached, waiting for reset)
//! 1 ..  pointer_id_base  sequential stops, assigned at compile time in step order
//! pointer_id_base + k    entry of conditional pointer k, assigned at build time
//! ```
//!
//! The two ranges are disjoint, so pointers numbered while the schema was still
//! being declared never collide with ids handed out during compilation.

use std::fmt;

use types::{FieldName, Value, ValueKind};

use super::step::{Kernel, PointerId, SlotId};
use crate::config::EngineConfig;

/// Resume identifier: the parse context's program counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResumeId(pub(crate) u32);

impl ResumeId {
    /// Parser stopped by an early end; reads consume nothing until reset
    pub const HALTED: ResumeId = ResumeId(0);

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ResumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::HALTED {
            f.write_str("halted")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Value slot of one named step
#[derive(Debug, Clone)]
pub(crate) struct SlotMeta {
    pub name: FieldName,
    /// Value before the step is read, and after every reset
    pub initial: Value,
    /// Cleared once the last reader has run and at every record boundary
    pub reset: bool,
    /// Visible to later steps only
    pub internal: bool,
    /// Dense index among exposed fields, assigned at compile time
    pub exposed: Option<usize>,
    /// Kind produced, when known statically
    pub kind: Option<ValueKind>,
}

impl SlotMeta {
    pub(crate) fn new(
        name: &str,
        initial: Value,
        reset: bool,
        kind: Option<ValueKind>,
    ) -> Self {
        Self {
            name: FieldName::from(name),
            initial,
            reset,
            internal: false,
            exposed: None,
            kind,
        }
    }
}

/// Position of a snippet in the program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Loc {
    pub step: usize,
    pub snippet: usize,
}

pub(crate) struct CompiledSnippet {
    pub label: &'static str,
    pub kernel: Kernel,
    /// Set for stops only
    pub resume: Option<ResumeId>,
    /// Resume id recorded when the snippet escapes
    pub escape_to: Option<ResumeId>,
    /// False when the escape target is already the recorded resume id
    pub records: bool,
}

pub(crate) struct CompiledStep {
    pub label: String,
    pub primitive: String,
    pub locals: Vec<&'static str>,
    pub snippets: Vec<CompiledSnippet>,
    /// Values cleared when control leaves this step
    pub resets: Vec<SlotId>,
}

/// Immutable compiled schema shared by every parser minted from it
pub(crate) struct Program {
    pub steps: Vec<CompiledStep>,
    pub slots: Vec<SlotMeta>,
    /// Exposed field index to slot
    pub exposed: Vec<SlotId>,
    /// Slots swept back to their initial value at every record boundary
    pub resettable: Vec<SlotId>,
    /// Resume id `n` (sequential range) lives at `sequential[n - 1]`
    pub sequential: Vec<Loc>,
    /// Pointer `k` lives at `pointers[k]`
    pub pointers: Vec<Loc>,
    pub config: EngineConfig,
}

impl Program {
    /// Resume id of the first step's entry
    pub(crate) fn initial(&self) -> ResumeId {
        self.steps
            .first()
            .and_then(|step| step.snippets.first())
            .and_then(|snippet| snippet.resume)
            .unwrap_or(ResumeId::HALTED)
    }

    pub(crate) fn locate(&self, id: ResumeId) -> Option<Loc> {
        let base = self.config.pointer_id_base;
        if id.0 >= base {
            self.pointers.get((id.0 - base) as usize).copied()
        } else if id.0 >= 1 {
            self.sequential.get((id.0 - 1) as usize).copied()
        } else {
            None
        }
    }

    pub(crate) fn pointer(&self, pointer: PointerId) -> Loc {
        self.pointers[pointer.index()]
    }

    pub(crate) fn slot_by_name(&self, name: &str) -> Option<(SlotId, &SlotMeta)> {
        self.slots
            .iter()
            .enumerate()
            .find(|(_, meta)| meta.name.as_ref() == name)
    }

    pub(crate) fn stop_count(&self) -> usize {
        self.sequential.len() + self.pointers.len()
    }
}

/// State table dump: one line per snippet
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} steps, {} stops, {} pointers",
            self.steps.len(),
            self.stop_count(),
            self.pointers.len()
        )?;
        for (index, step) in self.steps.iter().enumerate() {
            write!(f, "[{index:>3}] {} <{}>", step.label, step.primitive)?;
            if !step.locals.is_empty() {
                write!(f, " locals={}", step.locals.join(","))?;
            }
            if !step.resets.is_empty() {
                let names: Vec<&str> = step
                    .resets
                    .iter()
                    .map(|&slot| self.slots[slot].name.as_ref())
                    .collect();
                write!(f, " resets={}", names.join(","))?;
            }
            writeln!(f)?;
            for snippet in &step.snippets {
                let id = snippet
                    .resume
                    .map_or_else(|| "-".to_string(), |id| id.to_string());
                write!(f, "      {id:>12}  {:<8} {:?}", snippet.label, snippet.kernel)?;
                if let Some(target) = snippet.escape_to {
                    let mode = if snippet.records { "" } else { " (kept)" };
                    write!(f, " escape->{target}{mode}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
