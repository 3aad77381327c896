//! Case table collected by [`SchemaBuilder::switch`](super::SchemaBuilder::switch)

use types::Value;

use super::SchemaBuilder;

pub(crate) type Branch<'a> = Box<dyn FnOnce(SchemaBuilder) -> SchemaBuilder + 'a>;

pub(crate) enum Otherwise<'a> {
    Branch(Branch<'a>),
    Fail(String),
}

/// Cases of a tag dispatch, tried in declaration order
///
/// A dispatch must be exhaustive: finish it with [`otherwise`](Self::otherwise)
/// or [`otherwise_fail`](Self::otherwise_fail).
#[must_use]
pub struct SwitchBuilder<'a> {
    pub(crate) cases: Vec<(Value, Branch<'a>)>,
    pub(crate) otherwise: Option<Otherwise<'a>>,
}

impl<'a> SwitchBuilder<'a> {
    pub(crate) fn new() -> Self {
        Self {
            cases: Vec::new(),
            otherwise: None,
        }
    }

    /// Branch taken when the tag equals `value`
    pub fn case(
        mut self,
        value: impl Into<Value>,
        body: impl FnOnce(SchemaBuilder) -> SchemaBuilder + 'a,
    ) -> Self {
        self.cases.push((value.into(), Box::new(body)));
        self
    }

    /// Branch taken when no case matches
    pub fn otherwise(mut self, body: impl FnOnce(SchemaBuilder) -> SchemaBuilder + 'a) -> Self {
        self.otherwise = Some(Otherwise::Branch(Box::new(body)));
        self
    }

    /// Reject any tag without a case with [`ParseError::Unreachable`](crate::ParseError::Unreachable)
    pub fn otherwise_fail(mut self, reason: impl Into<String>) -> Self {
        self.otherwise = Some(Otherwise::Fail(reason.into()));
        self
    }
}
