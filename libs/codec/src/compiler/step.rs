//! Step and Snippet intermediate representation
//!
//! A [`Step`] is the compiled unit of one schema field. Its behaviour is split
//! into [`Snippet`]s, each holding a single [`Kernel`]: the instruction the
//! runtime executes when control reaches that snippet. Kernels are plain data,
//! so the compiler can derive each snippet's [`Effects`] by inspecting it
//! instead of trusting primitives to describe themselves.

use std::fmt;

use types::Value;

use crate::primitives::array::ArraySpec;
use crate::primitives::buffer::BufferForm;
use crate::primitives::derived::ComputeFn;
use crate::primitives::fixed::Decode;

/// Index of a value slot in the parse context (one per named step)
pub(crate) type SlotId = usize;

/// Snippet index of every step's entry point
pub(crate) const ENTRY: usize = 0;

/// Snippet index of the continuation a step resumes into after suspending
pub(crate) const RESUME: usize = 1;

/// Conditional jump target, numbered at schema-build time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub(crate) u32);

impl PointerId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a length or count comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Length {
    Fixed(usize),
    Slot(SlotId),
}

/// Snippet instruction
pub(crate) enum Kernel {
    /// Fixed-width value, all bytes in one pass or first partial copy
    FixedEntry { slot: SlotId, width: u8, decode: Decode },
    /// Fixed-width value, continue filling the scratch array
    FixedResume { slot: SlotId, width: u8, decode: Decode },
    /// Byte range: zero-copy when complete, else capture the first fragment
    BufferEntry { slot: SlotId, len: Length, form: BufferForm },
    /// Byte range: append fragments until the declared length is reached
    BufferResume { slot: SlotId, form: BufferForm },
    Const { slot: SlotId, value: Value },
    Mask { slot: SlotId, source: SlotId, mask: u64, flag: bool },
    Computed { slot: SlotId, deps: Vec<SlotId>, func: ComputeFn },
    /// Fall into the branch when the tag matches, otherwise jump past it
    Guard { tag: SlotId, expected: Value, else_to: PointerId },
    Pointer,
    Jump { to: PointerId },
    Fail { reason: String },
    End,
    ArrayEntry { slot: SlotId, count: Length, spec: ArraySpec },
    ArrayLoop { slot: SlotId, spec: ArraySpec },
}

impl Kernel {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Kernel::FixedEntry { .. } => "fixed",
            Kernel::FixedResume { .. } => "fixed-resume",
            Kernel::BufferEntry { .. } => "buffer",
            Kernel::BufferResume { .. } => "buffer-resume",
            Kernel::Const { .. } => "const",
            Kernel::Mask { flag: false, .. } => "mask",
            Kernel::Mask { flag: true, .. } => "flag",
            Kernel::Computed { .. } => "computed",
            Kernel::Guard { .. } => "guard",
            Kernel::Pointer => "pointer",
            Kernel::Jump { .. } => "jump",
            Kernel::Fail { .. } => "fail",
            Kernel::End => "end",
            Kernel::ArrayEntry { .. } => "array",
            Kernel::ArrayLoop { .. } => "array-loop",
        }
    }

    /// Control-flow and data effects of this instruction
    pub(crate) fn effects(&self) -> Effects {
        let mut fx = Effects::default();
        match self {
            Kernel::FixedEntry { slot, .. } | Kernel::FixedResume { slot, .. } => {
                fx.escape = Some(RESUME);
                fx.continues = true;
                fx.sets = Some(*slot);
            }
            Kernel::BufferEntry { slot, len, .. } => {
                if let Length::Slot(source) = len {
                    fx.reads.push(*source);
                }
                fx.escape = Some(RESUME);
                fx.continues = true;
                fx.sets = Some(*slot);
            }
            Kernel::BufferResume { slot, .. } => {
                fx.escape = Some(RESUME);
                fx.continues = true;
                fx.sets = Some(*slot);
            }
            Kernel::Const { slot, .. } => {
                fx.continues = true;
                fx.sets = Some(*slot);
            }
            Kernel::Mask { slot, source, .. } => {
                fx.reads.push(*source);
                fx.continues = true;
                fx.sets = Some(*slot);
            }
            Kernel::Computed { slot, deps, .. } => {
                fx.reads.extend(deps.iter().copied());
                fx.continues = true;
                fx.sets = Some(*slot);
            }
            Kernel::Guard { tag, else_to, .. } => {
                fx.reads.push(*tag);
                fx.continues = true;
                fx.jump = Some(*else_to);
            }
            Kernel::Pointer => fx.continues = true,
            Kernel::Jump { to } => fx.jump = Some(*to),
            Kernel::Fail { .. } => fx.fails = true,
            Kernel::End => fx.ends = true,
            Kernel::ArrayEntry { slot, count, .. } => {
                if let Length::Slot(source) = count {
                    fx.reads.push(*source);
                }
                fx.go = Some(RESUME);
                fx.continues = true;
                fx.sets = Some(*slot);
            }
            Kernel::ArrayLoop { slot, .. } => {
                fx.escape = Some(RESUME);
                fx.continues = true;
                fx.sets = Some(*slot);
            }
        }
        fx
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a snippet may do, derived from its kernel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Effects {
    /// Other steps' values read
    pub reads: Vec<SlotId>,
    /// Suspends, resuming at this snippet of the same step
    pub escape: Option<usize>,
    /// Hands control to this snippet of the same step without suspending
    pub go: Option<usize>,
    /// Jumps forward to a conditional pointer
    pub jump: Option<PointerId>,
    /// Hands off to the next step
    pub continues: bool,
    /// Terminates the schema
    pub ends: bool,
    /// Raises the unreachable-state error
    pub fails: bool,
    /// Writes this value slot (emitting a callback when the slot is exposed)
    pub sets: Option<SlotId>,
}

/// One control-flow node of a step
pub(crate) struct Snippet {
    pub label: &'static str,
    pub kernel: Kernel,
}

impl Snippet {
    pub(crate) fn new(label: &'static str, kernel: Kernel) -> Self {
        Self { label, kernel }
    }
}

/// Compiled unit of one schema field
pub(crate) struct Step {
    /// Field name, or a generated label for anonymous control steps
    pub label: String,
    /// Primitive that produced the step, for the state table dump
    pub primitive: String,
    /// Local variables that must survive a suspension
    pub locals: Vec<&'static str>,
    pub snippets: Vec<Snippet>,
    /// Set when this step is a conditional jump target
    pub pointer: Option<PointerId>,
}

impl Step {
    pub(crate) fn new(label: impl Into<String>, primitive: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            primitive: primitive.into(),
            locals: Vec::new(),
            snippets: Vec::new(),
            pointer: None,
        }
    }

    pub(crate) fn local(mut self, name: &'static str) -> Self {
        self.locals.push(name);
        self
    }

    pub(crate) fn snippet(mut self, label: &'static str, kernel: Kernel) -> Self {
        self.snippets.push(Snippet::new(label, kernel));
        self
    }
}
