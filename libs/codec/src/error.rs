//! Schema-time and parse-time errors
//!
//! Two categories only. [`SchemaError`] is raised while a schema is declared or
//! compiled, before a single byte is parsed, and is always a programming error.
//! [`ParseError`] is raised while bytes are parsed; apart from caller misuse of
//! the offset range it only signals a `fail` guard the schema author placed on
//! purpose. Running out of input is never an error: the parser suspends.

use thiserror::Error;
use types::ValueKind;

/// Errors raised while declaring or compiling a schema
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Field name does not match the identifier format
    #[error("Invalid field name {name:?}: names must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidName { name: String },

    /// Field name collides with a reserved word
    #[error("Field name {name:?} is reserved")]
    ReservedName { name: String },

    /// Field name already declared in the same scope
    #[error("Field {name:?} is already declared in this scope")]
    DuplicateName { name: String },

    /// Reference to a field that has not been declared earlier in scope
    #[error("Unknown field {name:?} (referenced by {referenced_by}): fields must be declared before use")]
    UnknownField { name: String, referenced_by: String },

    /// Referenced field produces the wrong kind of value
    #[error("Field {name:?} produces {actual} values but {referenced_by} needs an integer")]
    FieldKind {
        name: String,
        actual: ValueKind,
        referenced_by: String,
    },

    /// Integer width outside 1-8 bytes
    #[error("Invalid integer width {width} for {name:?}: supported widths are 1-8 bytes")]
    InvalidWidth { name: String, width: usize },

    /// Modifier called before any named step was declared
    #[error("{modifier}() needs a preceding named field")]
    NoStepToModify { modifier: &'static str },

    /// Switch declared without a default branch or fail guard
    #[error("Switch on {tag:?} has no otherwise branch: add otherwise(..) or otherwise_fail(..)")]
    UnguardedDispatch { tag: String },

    /// Switch case value declared twice (second branch unreachable)
    #[error("Switch on {tag:?} declares case {value} twice; the second branch is unreachable")]
    DuplicateCase { tag: String, value: String },

    /// Switch declared without any case
    #[error("Switch on {tag:?} declares no cases")]
    EmptyDispatch { tag: String },

    /// Sequential resume ids would collide with the reserved pointer range
    #[error("Schema needs {stops} resume points but the pointer range starts at {pointer_base:#x}")]
    ResumeIdSpaceExhausted { stops: usize, pointer_base: u32 },

    /// Branch closure returned a builder other than the one it was given
    #[error("Branch builder was replaced: when/switch bodies must return the builder they receive")]
    DetachedBranch,

    /// Some path completes a record without reading input, so the number of
    /// records would depend on how the stream is chunked
    #[error("Schema can complete a record without reading any input: every path must read at least one byte, fail or end")]
    EmptyRecord,

    /// Callback registered for a field that is not exposed by the schema
    #[error("Callback registered for {name:?}, which is not an exposed field of this schema")]
    UnknownCallback { name: String },
}

impl SchemaError {
    pub fn unknown_field(name: impl Into<String>, referenced_by: impl Into<String>) -> Self {
        Self::UnknownField {
            name: name.into(),
            referenced_by: referenced_by.into(),
        }
    }

    pub fn field_kind(
        name: impl Into<String>,
        actual: ValueKind,
        referenced_by: impl Into<String>,
    ) -> Self {
        Self::FieldKind {
            name: name.into(),
            actual,
            referenced_by: referenced_by.into(),
        }
    }
}

/// Errors raised while parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A `fail` guard was reached; the input carries a value the schema rejects
    #[error("Unreachable state reached at step {step}: {reason}")]
    Unreachable { step: String, reason: String },

    /// A length, count or mask source did not hold an integer when read
    #[error("Field {field:?} does not hold an integer (found {found})")]
    NotAnInteger { field: String, found: ValueKind },

    /// A length or count does not fit the platform's address space
    #[error("Field {field:?} value {value} does not fit in usize")]
    LengthOverflow { field: String, value: u64 },

    /// Caller passed an offset range outside the buffer
    #[error("Invalid read range {start}..{end} for a buffer of {len} bytes")]
    InvalidRange { start: usize, end: usize, len: usize },
}

impl ParseError {
    pub fn unreachable(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            step: step.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for schema declaration and compilation
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

/// Result type for parse operations
pub type ParseResult<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_field() {
        let err = SchemaError::unknown_field("len", "bytes_dyn(payload)");
        assert!(err.to_string().contains("\"len\""));
        assert!(err.to_string().contains("bytes_dyn(payload)"));

        let err = ParseError::unreachable("fail#3", "unknown opcode");
        assert_eq!(
            err.to_string(),
            "Unreachable state reached at step fail#3: unknown opcode"
        );
    }

    #[test]
    fn test_kind_error_formatting() {
        let err = SchemaError::field_kind("name", ValueKind::Text, "mask(bits)");
        assert_eq!(
            err.to_string(),
            "Field \"name\" produces text values but mask(bits) needs an integer"
        );
    }
}
