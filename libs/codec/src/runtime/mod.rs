//! # Runtime Engine
//!
//! ## Purpose
//!
//! Drives a compiled program over caller-supplied byte ranges. All suspension
//! is explicit: a read returns to the caller with the resume id recorded in the
//! stream's parse context, and the next read re-enters exactly that snippet.
//!
//! ## Architecture Role
//!
//! ```text
//! socket bytes ─▶ Parser::read_one / read_many ─▶ Machine::run ─▶ kernels
//!                        │                                          │
//!                  ParseContext                                Sink::field
//!              (pc, values, locals)                         Sink::record_end
//! ```
//!
//! ## Resource Model
//!
//! Single-threaded and synchronous. Only fixed-width scratch arrays and copied
//! fragments of split byte ranges outlive a call; complete byte ranges are
//! refcounted slices of the caller's [`Bytes`](bytes::Bytes).

pub(crate) mod context;
pub(crate) mod cursor;
pub(crate) mod engine;
pub(crate) mod parser;
pub(crate) mod sink;

pub use parser::{CompiledSchema, Parser};
pub use sink::{BoundCallbacks, Callbacks, FieldRef, Sink};
