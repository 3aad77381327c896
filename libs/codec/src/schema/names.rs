//! Field name validation

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{SchemaError, SchemaResult};

static NAME_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static name pattern"));

/// Rust keywords, so field names can become struct members, plus names the
/// engine uses for generated steps
const RESERVED: &[&str] = &[
    "_", "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield", "union",
    "record_end",
];

/// Prefix reserved for engine-generated names
const RESERVED_PREFIXES: &[&str] = &["__"];

pub(crate) fn check(name: &str) -> SchemaResult<()> {
    if !NAME_FORMAT.is_match(name) {
        return Err(SchemaError::InvalidName {
            name: name.to_string(),
        });
    }
    if RESERVED.contains(&name) || RESERVED_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return Err(SchemaError::ReservedName {
            name: name.to_string(),
        });
    }
    Ok(())
}
