//! Static analysis over step snippet graphs
//!
//! Works purely on kernel [`Effects`]:
//! - reachability and stop detection inside a step
//! - resume bookkeeping elimination for snippets only ever entered by resumption
//! - last-consumer resets for resettable values
//! - the fewest input bytes any record can be completed with

use std::collections::HashSet;

use super::program::{Program, SlotMeta};
use super::step::{Effects, Kernel, Length, SlotId, Step, ENTRY};

/// Per-step analysis results, indexed by snippet
#[derive(Debug)]
pub(crate) struct StepAnalysis {
    pub effects: Vec<Effects>,
    pub reachable: Vec<bool>,
    /// Snippets that need a resume id
    pub stops: Vec<bool>,
    /// Whether an escape from the snippet must write the resume id
    pub records: Vec<bool>,
}

impl StepAnalysis {
    /// Values read by any reachable snippet of the step
    pub(crate) fn reads(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.effects
            .iter()
            .zip(&self.reachable)
            .filter(|(_, reachable)| **reachable)
            .flat_map(|(fx, _)| fx.reads.iter().copied())
    }

    /// Value written by the step, if any
    pub(crate) fn sets(&self) -> Option<SlotId> {
        self.effects.iter().find_map(|fx| fx.sets)
    }
}

pub(crate) fn analyze_step(step: &Step) -> StepAnalysis {
    let effects: Vec<Effects> = step.snippets.iter().map(|s| s.kernel.effects()).collect();
    let count = effects.len();

    let mut reachable = vec![false; count];
    let mut pending = vec![ENTRY];
    while let Some(i) = pending.pop() {
        if i >= count || reachable[i] {
            continue;
        }
        reachable[i] = true;
        pending.extend(effects[i].escape);
        pending.extend(effects[i].go);
    }

    // Targets named by a different snippet of the same step
    let mut escape_targets = HashSet::new();
    let mut go_targets = HashSet::new();
    for (i, fx) in effects.iter().enumerate() {
        if !reachable[i] {
            continue;
        }
        if let Some(t) = fx.escape.filter(|&t| t != i) {
            escape_targets.insert(t);
        }
        if let Some(t) = fx.go.filter(|&t| t != i) {
            go_targets.insert(t);
        }
    }

    let stops: Vec<bool> = (0..count)
        .map(|i| {
            reachable[i]
                && (i == ENTRY
                    || effects[i].escape == Some(i)
                    || escape_targets.contains(&i)
                    || go_targets.contains(&i))
        })
        .collect();

    // A self-escaping snippet entered only through its own resume id already
    // has that id recorded; entries are reached by continue/jump and always record
    let records: Vec<bool> = (0..count)
        .map(|i| {
            let Some(target) = effects[i].escape else {
                return false;
            };
            let resume_only = i != ENTRY && !go_targets.contains(&i);
            !(target == i && resume_only)
        })
        .collect();

    StepAnalysis {
        effects,
        reachable,
        stops,
        records,
    }
}

/// For every step, the resettable values it clears when control leaves it
///
/// A resettable value is cleared by the latest step that can still read it; a
/// value nothing reads is cleared by its own step right after emission.
pub(crate) fn reset_points(analyses: &[StepAnalysis], slots: &[SlotMeta]) -> Vec<Vec<SlotId>> {
    let mut last_use: Vec<Option<usize>> = vec![None; slots.len()];

    for (step, analysis) in analyses.iter().enumerate() {
        let touched = analysis.sets().into_iter().chain(analysis.reads());
        for slot in touched {
            let entry = &mut last_use[slot];
            *entry = Some(entry.map_or(step, |prev| prev.max(step)));
        }
    }

    let mut resets = vec![Vec::new(); analyses.len()];
    for (slot, meta) in slots.iter().enumerate() {
        if !meta.reset {
            continue;
        }
        if let Some(step) = last_use[slot] {
            resets[step].push(slot);
        }
    }
    resets
}

/// Fewest input bytes a record of `program` can complete with
///
/// Walks the forward-only step list once, relaxing both edges of every guard.
/// Field-sourced lengths and counts may be zero. A path into `fail` never
/// completes; a path into `end` completes only when `end_completes` is set
/// (array elements). `None` when no path completes a record.
pub(crate) fn min_record_bytes(program: &Program, end_completes: bool) -> Option<usize> {
    let steps = &program.steps;
    let mut best: Vec<Option<usize>> = vec![None; steps.len() + 1];
    let mut completed: Option<usize> = None;
    best[0] = Some(0);

    for (index, step) in steps.iter().enumerate() {
        let Some(bytes) = best[index] else {
            continue;
        };
        let Some(entry) = step.snippets.get(ENTRY) else {
            continue;
        };
        match &entry.kernel {
            Kernel::FixedEntry { width, .. } => {
                relax(&mut best[index + 1], bytes.saturating_add(*width as usize))
            }
            Kernel::BufferEntry { len, .. } => {
                let len = match len {
                    Length::Fixed(n) => *n,
                    Length::Slot(_) => 0,
                };
                relax(&mut best[index + 1], bytes.saturating_add(len));
            }
            Kernel::ArrayEntry { count, spec, .. } => {
                let element = match count {
                    Length::Fixed(n) => min_record_bytes(&spec.program, true)
                        .unwrap_or(0)
                        .saturating_mul(*n),
                    Length::Slot(_) => 0,
                };
                relax(&mut best[index + 1], bytes.saturating_add(element));
            }
            Kernel::Guard { else_to, .. } => {
                relax(&mut best[index + 1], bytes);
                relax(&mut best[program.pointer(*else_to).step], bytes);
            }
            Kernel::Jump { to } => relax(&mut best[program.pointer(*to).step], bytes),
            Kernel::End => {
                if end_completes {
                    relax(&mut completed, bytes);
                }
            }
            Kernel::Fail { .. } => {}
            _ => relax(&mut best[index + 1], bytes),
        }
    }

    if let Some(bytes) = best[steps.len()] {
        relax(&mut completed, bytes);
    }
    completed
}

fn relax(slot: &mut Option<usize>, bytes: usize) {
    *slot = Some(slot.map_or(bytes, |prev| prev.min(bytes)));
}
