//! Builder intermediate representation and the guard relocation pass
//!
//! A conditional's guard cannot be built when its position is reached: its
//! else-target is the pointer appended after the branch body. The builder
//! leaves a [`Item::Placeholder`] in the guard's position and records the
//! guard in a side table; [`relocate`] turns the list into plain steps once
//! every pointer exists.

use std::collections::HashMap;

use types::Value;

use crate::compiler::step::{PointerId, SlotId, Step};
use crate::error::{SchemaError, SchemaResult};
use crate::primitives::control;

pub(crate) enum Item {
    Step(Step),
    /// Guard `n` of the side table goes here
    Placeholder(usize),
}

/// Guard waiting for its else-target
pub(crate) struct GuardSpec {
    pub label: String,
    pub tag: SlotId,
    pub expected: Value,
    pub else_to: Option<PointerId>,
}

/// Splice guards into place and check every jump points forward
pub(crate) fn relocate(items: Vec<Item>, guards: Vec<GuardSpec>) -> SchemaResult<Vec<Step>> {
    let mut guards: Vec<Option<GuardSpec>> = guards.into_iter().map(Some).collect();

    let mut steps = Vec::with_capacity(items.len());
    for item in items {
        let step = match item {
            Item::Step(step) => step,
            Item::Placeholder(index) => {
                let guard = guards
                    .get_mut(index)
                    .and_then(Option::take)
                    .ok_or(SchemaError::DetachedBranch)?;
                let else_to = guard.else_to.ok_or(SchemaError::DetachedBranch)?;
                control::guard_step(guard.label, guard.tag, guard.expected, else_to)
            }
        };
        steps.push(step);
    }

    check_forward(&steps)?;
    Ok(steps)
}

/// Pointers are only ever targeted from earlier steps
fn check_forward(steps: &[Step]) -> SchemaResult<()> {
    let positions: HashMap<PointerId, usize> = steps
        .iter()
        .enumerate()
        .filter_map(|(index, step)| step.pointer.map(|pointer| (pointer, index)))
        .collect();

    for (index, step) in steps.iter().enumerate() {
        for snippet in &step.snippets {
            if let Some(target) = snippet.kernel.effects().jump {
                match positions.get(&target) {
                    Some(&at) if at > index => {}
                    _ => return Err(SchemaError::DetachedBranch),
                }
            }
        }
    }
    Ok(())
}
