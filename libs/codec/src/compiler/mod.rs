//! # Step Compiler
//!
//! ## Purpose
//!
//! Turns the relocated step list produced by the schema builder into a flat
//! [`Program`]: every stop gets a resume id, every escape knows which id to
//! record, and every step knows which values to clear when control leaves it.
//!
//! ## Architecture Role
//!
//! ```text
//! SchemaBuilder → relocate() → [compile()] → Program → Parser
//!   Steps with      guards        analysis      resume-id
//!   placeholders    spliced       + numbering   state table
//! ```

pub(crate) mod analysis;
pub(crate) mod program;
pub(crate) mod step;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{SchemaError, SchemaResult};
use analysis::{analyze_step, reset_points};
use program::{CompiledSnippet, CompiledStep, Loc, Program, ResumeId, SlotMeta};
use step::Step;

/// Compile relocated steps into a resumable program
pub(crate) fn compile(
    steps: Vec<Step>,
    mut slots: Vec<SlotMeta>,
    pointer_count: usize,
    config: EngineConfig,
) -> SchemaResult<Program> {
    let analyses: Vec<_> = steps.iter().map(analyze_step).collect();
    let resets = reset_points(&analyses, &slots);

    // Sequential ids first: pointer ids are already fixed by the builder
    let mut sequential = Vec::new();
    let mut pointers: Vec<Option<Loc>> = vec![None; pointer_count];
    let mut ids: Vec<Vec<Option<ResumeId>>> = Vec::with_capacity(steps.len());

    for (step_index, (step, analysis)) in steps.iter().zip(&analyses).enumerate() {
        let mut step_ids = vec![None; step.snippets.len()];
        for (snippet, is_stop) in analysis.stops.iter().enumerate() {
            if !is_stop {
                continue;
            }
            let loc = Loc {
                step: step_index,
                snippet,
            };
            let id = match step.pointer {
                Some(pointer) if snippet == step::ENTRY => {
                    pointers[pointer.index()] = Some(loc);
                    let id = config.pointer_id_base.checked_add(pointer.0).ok_or(
                        SchemaError::ResumeIdSpaceExhausted {
                            stops: pointer_count,
                            pointer_base: config.pointer_id_base,
                        },
                    )?;
                    ResumeId(id)
                }
                _ => {
                    sequential.push(loc);
                    ResumeId(sequential.len() as u32)
                }
            };
            step_ids[snippet] = Some(id);
        }
        ids.push(step_ids);
    }

    if sequential.len() >= config.pointer_id_base as usize {
        return Err(SchemaError::ResumeIdSpaceExhausted {
            stops: sequential.len(),
            pointer_base: config.pointer_id_base,
        });
    }
    let pointers: Vec<Loc> = pointers
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(SchemaError::DetachedBranch)?;

    let mut exposed = Vec::new();
    for (slot, meta) in slots.iter_mut().enumerate() {
        if !meta.internal {
            meta.exposed = Some(exposed.len());
            exposed.push(slot);
        }
    }
    let resettable: Vec<_> = slots
        .iter()
        .enumerate()
        .filter(|(_, meta)| meta.reset)
        .map(|(slot, _)| slot)
        .collect();

    let compiled_steps: Vec<CompiledStep> = steps
        .into_iter()
        .zip(analyses)
        .zip(resets)
        .zip(ids)
        .map(|(((step, analysis), resets), step_ids)| {
            let snippets = step
                .snippets
                .into_iter()
                .enumerate()
                .map(|(i, snippet)| CompiledSnippet {
                    label: snippet.label,
                    kernel: snippet.kernel,
                    resume: step_ids[i],
                    escape_to: analysis.effects[i]
                        .escape
                        .and_then(|target| step_ids.get(target).copied().flatten()),
                    records: analysis.records[i],
                })
                .collect();
            CompiledStep {
                label: step.label,
                primitive: step.primitive,
                locals: step.locals,
                snippets,
                resets,
            }
        })
        .collect();

    let program = Program {
        steps: compiled_steps,
        slots,
        exposed,
        resettable,
        sequential,
        pointers,
        config,
    };

    debug!(
        steps = program.steps.len(),
        stops = program.stop_count(),
        pointers = program.pointers.len(),
        exposed = program.exposed.len(),
        "schema compiled"
    );
    Ok(program)
}
