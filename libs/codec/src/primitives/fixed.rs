//! Fixed-width fields: little-endian integers and 128-bit identifiers
//!
//! When every byte is available the value is assembled straight from the input.
//! Otherwise the available bytes are copied one at a time into a 16-byte scratch
//! array that survives suspension, and the value is assembled once the last
//! byte arrives.

use types::{Uuid, Value};

use crate::compiler::step::{Kernel, SlotId, Step};
use crate::error::ParseResult;
use crate::runtime::context::Local;
use crate::runtime::engine::{Flow, Machine};

/// Width of a 128-bit identifier on the wire
pub(crate) const UUID_WIDTH: u8 = 16;

/// How raw little-endian bytes become a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decode {
    UInt,
    /// Two's complement, sign-extended to 64 bits
    Int,
    Uuid,
    /// Canonical hyphenated lower-case hex
    UuidText,
}

impl Decode {
    pub(crate) fn assemble(self, raw: &[u8]) -> Value {
        match self {
            Decode::UInt => Value::UInt(fold_le(raw)),
            Decode::Int => {
                let shift = 64 - 8 * raw.len() as u32;
                Value::Int(((fold_le(raw) << shift) as i64) >> shift)
            }
            Decode::Uuid => Uuid::from_slice(raw).map_or(Value::Empty, Value::Uuid),
            Decode::UuidText => Uuid::from_slice(raw).map_or(Value::Empty, |id| {
                Value::Text(id.hyphenated().to_string())
            }),
        }
    }
}

fn fold_le(raw: &[u8]) -> u64 {
    raw.iter()
        .rev()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte))
}

/// Partially read fixed-width value
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    bytes: [u8; 16],
    filled: u8,
}

impl Scratch {
    /// Copy up to the remaining width from `available`; returns bytes taken
    fn fill(&mut self, available: &[u8], width: u8) -> usize {
        let need = usize::from(width.saturating_sub(self.filled));
        let mut taken = 0;
        for &byte in available.iter().take(need) {
            self.bytes[usize::from(self.filled)] = byte;
            self.filled += 1;
            taken += 1;
        }
        taken
    }

    fn is_complete(&self, width: u8) -> bool {
        self.filled >= width
    }

    fn raw(&self, width: u8) -> &[u8] {
        &self.bytes[..usize::from(width)]
    }
}

pub(crate) fn step(label: &str, primitive: String, slot: SlotId, width: u8, decode: Decode) -> Step {
    Step::new(label, primitive)
        .local("scratch")
        .snippet(
            "entry",
            Kernel::FixedEntry {
                slot,
                width,
                decode,
            },
        )
        .snippet(
            "resume",
            Kernel::FixedResume {
                slot,
                width,
                decode,
            },
        )
}

pub(crate) fn exec_entry(
    m: &mut Machine<'_, '_>,
    slot: SlotId,
    width: u8,
    decode: Decode,
) -> ParseResult<Flow> {
    let width_bytes = usize::from(width);
    if m.cursor.available() >= width_bytes {
        let value = decode.assemble(m.cursor.take_slice(width_bytes));
        m.set(slot, value);
        return Ok(Flow::Continue);
    }

    let mut scratch = Scratch::default();
    let taken = scratch.fill(m.cursor.remaining(), width);
    m.cursor.advance(taken);
    *m.local() = Local::Scratch(scratch);
    Ok(Flow::Escape)
}

pub(crate) fn exec_resume(
    m: &mut Machine<'_, '_>,
    slot: SlotId,
    width: u8,
    decode: Decode,
) -> ParseResult<Flow> {
    let mut scratch = match m.take_local() {
        Local::Scratch(scratch) => scratch,
        _ => Scratch::default(),
    };
    let taken = scratch.fill(m.cursor.remaining(), width);
    m.cursor.advance(taken);
    if !scratch.is_complete(width) {
        m.put_local(Local::Scratch(scratch));
        return Ok(Flow::Escape);
    }

    m.set(slot, decode.assemble(scratch.raw(width)));
    Ok(Flow::Continue)
}
