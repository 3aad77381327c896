//! Byte-range fields: raw bytes and UTF-8 text of fixed or field-given length
//!
//! A range that is complete in the current input becomes a zero-copy
//! [`Bytes`] slice of it. A range split across calls is copied fragment by
//! fragment and joined once the declared length has arrived; the join strategy
//! is picked by [`EngineConfig::join_copy_threshold`](crate::EngineConfig).

use bytes::Bytes;
use types::Value;

use crate::compiler::step::{Kernel, Length, SlotId, Step};
use crate::error::ParseResult;
use crate::runtime::context::Local;
use crate::runtime::engine::{Flow, Machine};

/// Value produced from a completed range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BufferForm {
    Bytes,
    /// Decoded lossily: invalid sequences become U+FFFD
    Text,
}

impl BufferForm {
    fn finish(self, bytes: Bytes) -> Value {
        match self {
            BufferForm::Bytes => Value::Bytes(bytes),
            BufferForm::Text => Value::Text(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}

/// Copied pieces of a range still waiting for bytes
#[derive(Debug, Default)]
pub(crate) struct Fragments {
    parts: Vec<Vec<u8>>,
    total: usize,
    remaining: usize,
}

impl Fragments {
    fn new(total: usize) -> Self {
        Self {
            parts: Vec::new(),
            total,
            remaining: total,
        }
    }

    fn append(&mut self, piece: &[u8]) {
        if !piece.is_empty() {
            self.parts.push(piece.to_vec());
            self.remaining -= piece.len();
        }
    }
}

/// Join copied fragments into one buffer of `total` bytes
///
/// Small joins copy byte by byte into a destination sized up front; larger
/// ones use the bulk slice join.
pub(crate) fn join(parts: &[Vec<u8>], total: usize, threshold: usize) -> Bytes {
    if total <= threshold {
        let mut joined = Vec::with_capacity(total);
        for part in parts {
            for &byte in part {
                joined.push(byte);
            }
        }
        Bytes::from(joined)
    } else {
        Bytes::from(parts.concat())
    }
}

pub(crate) fn step(label: &str, primitive: String, slot: SlotId, len: Length, form: BufferForm) -> Step {
    Step::new(label, primitive)
        .local("fragments")
        .snippet("entry", Kernel::BufferEntry { slot, len, form })
        .snippet("resume", Kernel::BufferResume { slot, form })
}

pub(crate) fn exec_entry(
    m: &mut Machine<'_, '_>,
    slot: SlotId,
    len: Length,
    form: BufferForm,
) -> ParseResult<Flow> {
    let len = m.length(len)?;
    if m.cursor.available() >= len {
        let bytes = m.cursor.take(len);
        m.set(slot, form.finish(bytes));
        return Ok(Flow::Continue);
    }

    let mut fragments = Fragments::new(len);
    let available = m.cursor.available();
    fragments.append(m.cursor.take_slice(available));
    *m.local() = Local::Fragments(fragments);
    Ok(Flow::Escape)
}

pub(crate) fn exec_resume(
    m: &mut Machine<'_, '_>,
    slot: SlotId,
    form: BufferForm,
) -> ParseResult<Flow> {
    let mut fragments = match m.take_local() {
        Local::Fragments(fragments) => fragments,
        _ => Fragments::default(),
    };
    let take = fragments.remaining.min(m.cursor.available());
    fragments.append(m.cursor.take_slice(take));
    if fragments.remaining > 0 {
        m.put_local(Local::Fragments(fragments));
        return Ok(Flow::Escape);
    }

    let joined = join(
        &fragments.parts,
        fragments.total,
        m.config().join_copy_threshold,
    );
    m.set(slot, form.finish(joined));
    Ok(Flow::Continue)
}
