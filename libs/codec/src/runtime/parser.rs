//! Compiled schema handle and per-stream parser

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use types::Value;

use super::context::ParseContext;
use super::cursor::Cursor;
use super::engine::Machine;
use super::sink::{BoundCallbacks, Callbacks, Sink};
use crate::compiler::program::{Program, ResumeId};
use crate::config::EngineConfig;
use crate::error::{ParseError, ParseResult, SchemaResult};

/// Immutable compiled schema
///
/// Cheap to clone and safe to share between threads; every [`Parser`] minted
/// from it owns an independent parse context.
#[derive(Clone)]
pub struct CompiledSchema {
    program: Arc<Program>,
}

impl CompiledSchema {
    pub(crate) fn new(program: Program) -> Self {
        Self {
            program: Arc::new(program),
        }
    }

    /// Parser delivering events to `sink`
    pub fn parser<S: Sink>(&self, sink: S) -> Parser<S> {
        Parser {
            program: Arc::clone(&self.program),
            ctx: ParseContext::new(&self.program),
            sink,
        }
    }

    /// Parser delivering events to a callback table
    ///
    /// Fails with [`SchemaError::UnknownCallback`](crate::SchemaError::UnknownCallback)
    /// when a callback names a field that is unknown or internal.
    pub fn parser_with_callbacks(&self, callbacks: Callbacks) -> SchemaResult<Parser<BoundCallbacks>> {
        let bound = callbacks.bind(&self.program)?;
        Ok(self.parser(bound))
    }

    /// Exposed field names, indexed like [`FieldRef::index`](crate::FieldRef::index)
    pub fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.program
            .exposed
            .iter()
            .map(|&slot| self.program.slots[slot].name.as_ref())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.program.config
    }

    /// Number of resume points (sequential stops plus pointers)
    pub fn stop_count(&self) -> usize {
        self.program.stop_count()
    }
}

/// Renders the resume-id state table
impl fmt::Display for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.program, f)
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("steps", &self.program.steps.len())
            .field("stops", &self.program.stop_count())
            .field("fields", &self.fields().collect::<Vec<_>>())
            .finish()
    }
}

/// Resumable parser for one byte stream
pub struct Parser<S> {
    program: Arc<Program>,
    ctx: ParseContext,
    sink: S,
}

impl<S: Sink> Parser<S> {
    /// Parse from `start` until a suspension or the end of one record
    ///
    /// Returns the offset reached. Never reads at or past `end`; an empty range
    /// returns `start` without delivering anything.
    pub fn read_one(&mut self, bytes: &Bytes, start: usize, end: usize) -> ParseResult<usize> {
        if start > end || end > bytes.len() {
            return Err(ParseError::InvalidRange {
                start,
                end,
                len: bytes.len(),
            });
        }
        if start == end || self.program.steps.is_empty() {
            return Ok(start);
        }

        let mut cursor = Cursor::new(bytes, start, end);
        Machine::new(&self.program, &mut self.ctx, &mut cursor, &mut self.sink).run()?;
        Ok(cursor.position())
    }

    /// Parse as many records as `[start, end)` holds
    ///
    /// Stops at `end` or as soon as a pass makes no progress: the parser is
    /// waiting for more bytes, or halted.
    pub fn read_many(&mut self, bytes: &Bytes, start: usize, end: usize) -> ParseResult<()> {
        let mut offset = start;
        loop {
            let next = self.read_one(bytes, offset, end)?;
            if next == offset || next == end {
                return Ok(());
            }
            offset = next;
        }
    }

    /// Parse the whole buffer
    pub fn feed(&mut self, bytes: &Bytes) -> ParseResult<()> {
        self.read_many(bytes, 0, bytes.len())
    }

    /// Drop all parse state, including persistent values, as if newly created
    pub fn reset(&mut self) {
        self.ctx.reset(&self.program);
    }

    /// An early end was reached; reads consume nothing until [`reset`](Self::reset)
    pub fn is_halted(&self) -> bool {
        self.ctx.pc == ResumeId::HALTED
    }

    pub fn resume_id(&self) -> ResumeId {
        self.ctx.pc
    }

    /// Current value of a top-level field
    ///
    /// Resettable values are cleared once their last reader has run, so this
    /// mostly reflects fields of the record in progress and persistent values.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.program
            .slot_by_name(name)
            .map(|(slot, _)| &self.ctx.values[slot])
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S> fmt::Debug for Parser<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("resume_id", &self.ctx.pc)
            .finish_non_exhaustive()
    }
}
