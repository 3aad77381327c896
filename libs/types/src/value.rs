//! Field values
//!
//! A [`Value`] is what a schema step exposes once it has been fully read:
//! what field callbacks receive and what later steps read back.

use std::fmt;

use bytes::Bytes;
use uuid::Uuid;

use crate::record::Record;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A parsed field value
///
/// `Empty` is the initial value of every non-constant step: it is what a later
/// step observes when it reads a field that has not been read in the current
/// record (for example a field inside a conditional branch that was skipped).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    /// No value has been read yet
    #[default]
    Empty,
    /// Boolean sub-field derived from a flags integer
    Bool(bool),
    /// Unsigned little-endian integer (1-8 bytes), exact up to `u64::MAX`
    UInt(u64),
    /// Signed little-endian integer (1-8 bytes), sign-extended to 64 bits
    Int(i64),
    /// 128-bit identifier in structured form
    Uuid(Uuid),
    /// Raw byte range (zero-copy slice when read in one pass)
    Bytes(Bytes),
    /// UTF-8 text
    Text(String),
    /// One array element, emitted per element in continuous mode
    Record(Record),
    /// All elements of an array, emitted after the last element
    List(Vec<Record>),
}

/// Discriminant of a [`Value`], used for schema-time type checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Empty,
    Bool,
    UInt,
    Int,
    Uuid,
    Bytes,
    Text,
    Record,
    List,
}

impl ValueKind {
    /// Whether values of this kind can be used as a length, count, mask source or tag
    pub fn is_integer(self) -> bool {
        matches!(self, ValueKind::UInt | ValueKind::Int)
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Empty => "empty",
            ValueKind::Bool => "bool",
            ValueKind::UInt => "uint",
            ValueKind::Int => "int",
            ValueKind::Uuid => "uuid",
            ValueKind::Bytes => "bytes",
            ValueKind::Text => "text",
            ValueKind::Record => "record",
            ValueKind::List => "list",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Empty => ValueKind::Empty,
            Value::Bool(_) => ValueKind::Bool,
            Value::UInt(_) => ValueKind::UInt,
            Value::Int(_) => ValueKind::Int,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Text(_) => ValueKind::Text,
            Value::Record(_) => ValueKind::Record,
            Value::List(_) => ValueKind::List,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Unsigned view of an integer value; negative signed values have none
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt(v) => Some(v),
            Value::Int(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Signed view of an integer value; unsigned values above `i64::MAX` have none
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::UInt(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match *self {
            Value::Uuid(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Record]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => f.write_str("<empty>"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Uuid(id) => write!(f, "{}", id.hyphenated()),
            Value::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Record(r) => write!(f, "{r}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::UInt(u64::from(v))
            }
        })*
    };
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_unsigned!(u8, u16, u32, u64);
impl_from_signed!(i8, i16, i32, i64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<&'static [u8]> for Value {
    fn from(v: &'static [u8]) -> Self {
        Value::Bytes(Bytes::from_static(v))
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_views() {
        assert_eq!(Value::UInt(0xffed).as_u64(), Some(0xffed));
        assert_eq!(Value::Int(-1).as_u64(), None);
        assert_eq!(Value::Int(42).as_u64(), Some(42));
        assert_eq!(Value::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Value::Text("3".into()).as_u64(), None);
        assert!(ValueKind::Int.is_integer());
        assert!(!ValueKind::Bytes.is_integer());
    }

    #[test]
    fn test_wide_integer_is_exact() {
        // Above 2^53 a float would round; the u64 must not
        let v = Value::from(0xffed_cba9_8765_4321u64);
        assert_eq!(v.as_u64(), Some(0xffed_cba9_8765_4321));
        assert_eq!(v.to_string(), "18441921395520346913");
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(Value::from(vec![0xff, 0xed, 0xcb]).to_string(), "0xffedcb");
        assert_eq!(Value::Empty.to_string(), "<empty>");
        let id = Uuid::from_bytes([
            0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab,
            0xcd, 0xef,
        ]);
        assert_eq!(
            Value::from(id).to_string(),
            "12345678-9abc-def0-0123-456789abcdef"
        );
    }

    #[test]
    fn test_default_is_empty() {
        assert!(Value::default().is_empty());
        assert_eq!(Value::default().kind(), ValueKind::Empty);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize_to_json() {
        let json = serde_json::to_string(&Value::UInt(255)).unwrap();
        assert_eq!(json, r#"{"UInt":255}"#);
    }
}
