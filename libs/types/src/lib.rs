//! # Framewire Value Types
//!
//! Pure data produced by the Framewire schema engine. Nothing in this crate
//! knows how bytes are parsed; it only describes what a parsed field looks like.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: 8-byte integers are carried as exact `u64`/`i64`
//! - **Zero-Copy Friendly**: raw byte fields are refcounted [`bytes::Bytes`]
//!   slices, so a field read in one pass shares the caller's buffer
//! - **Ordered Records**: array elements keep their fields in schema order
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [libs/codec] → protocol layer
//!     ↑             ↓               ↓
//! Value/Record  Schema engine   Packet/message
//! definitions   ParseContext    header schemas
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{Record, Value};
//!
//! let mut element = Record::new();
//! element.push("id", Value::UInt(7));
//! element.push("label", Value::from("seven"));
//!
//! assert_eq!(element.get("id").and_then(Value::as_u64), Some(7));
//! assert_eq!(element.to_string(), r#"{id: 7, label: "seven"}"#);
//! ```

pub mod record;
pub mod value;

pub use record::{FieldName, Record};
pub use value::{Value, ValueKind};

// The identifier type is owned by the uuid crate; re-exported so consumers
// match on `Value::Uuid` without a direct dependency.
pub use uuid::Uuid;
