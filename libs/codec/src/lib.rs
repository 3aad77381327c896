//! # Framewire Codec - Resumable Schema Engine
//!
//! ## Purpose
//!
//! Declares binary record layouts field by field and compiles them into
//! parsers that accept a byte stream in arbitrarily sized fragments, exactly as
//! a socket delivers them. Whatever the chunking, a parser produces the same
//! ordered sequence of field values and record boundaries.
//!
//! ## Integration Points
//!
//! - **Schema Authoring**: [`SchemaBuilder`] primitives and combinators
//! - **Stream Parsing**: [`Parser::read_one`] / [`Parser::read_many`] over
//!   caller-owned [`Bytes`](bytes::Bytes)
//! - **Delivery**: a [`Sink`] implementation or a [`Callbacks`] table
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → protocol layer
//!     ↑           ↓             ↓
//!   Value     SchemaBuilder   packet / message / file
//!   Record    → compiler      header schemas, socket
//!             → Parser        fragments in, callbacks out
//! ```
//!
//! ## What This Crate Contains
//! - Field primitives: little-endian integers, 128-bit identifiers, byte
//!   ranges, UTF-8 text, constants, masks, flags, computed values, fail, end
//! - Combinators: `when`, `switch`, `array`, `array_continuous`
//! - Step compiler: resume-id numbering, stop detection, last-consumer resets
//! - Runtime engine: an interpreted state table driven by resume ids
//!
//! ## What This Crate Does NOT Contain
//! - Packet framing, channel multiplexing or flow control
//! - Socket I/O or buffering beyond a split multi-byte value
//! - The write-side encoder
//! - Cross-field consistency checks such as "declared length matches payload"
//!
//! ## Example
//!
//! ```
//! use bytes::Bytes;
//! use codec::{Callbacks, SchemaBuilder};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let schema = SchemaBuilder::new()
//!     .uint8("len").internal()
//!     .bytes_dyn("raw", "len")
//!     .compile()
//!     .unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//! let mut parser = schema
//!     .parser_with_callbacks(Callbacks::new().on("raw", move |v| log.borrow_mut().push(v.clone())))
//!     .unwrap();
//!
//! // Two fragments of one record
//! let first = Bytes::from_static(&[0x03, 0xff]);
//! let second = Bytes::from_static(&[0xed, 0xcb]);
//! parser.read_many(&first, 0, first.len()).unwrap();
//! assert!(seen.borrow().is_empty());
//! parser.read_many(&second, 0, second.len()).unwrap();
//! assert_eq!(seen.borrow()[0].as_bytes().unwrap().as_ref(), &[0xff, 0xed, 0xcb]);
//! ```

pub mod config;
pub mod error;

pub(crate) mod compiler;
pub(crate) mod primitives;
pub mod runtime;
pub mod schema;

pub use compiler::program::ResumeId;
pub use config::{ConfigError, EngineConfig};
pub use error::{ParseError, ParseResult, SchemaError, SchemaResult};
pub use runtime::{BoundCallbacks, Callbacks, CompiledSchema, FieldRef, Parser, Sink};
pub use schema::{Len, SchemaBuilder, SwitchBuilder};

pub use types::{FieldName, Record, Uuid, Value, ValueKind};
