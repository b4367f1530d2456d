/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Back end of a compiler toolchain: takes a machine-independent IR
//! (objects, storage classes, routines, three-address instructions) and
//! emits x86 NASM assembler text. [`generate`] is the single entry point,
//! sequencing block formation, liveness, layout, and emission; each pass
//! is also exposed directly for the textual front end and for tests.

pub mod blocks;
pub mod emit;
pub mod errors;
pub mod ir;
pub mod layout;
pub mod liveness;
pub mod target;
pub mod text_ir;

use anyhow::{Context, Result};

use crate::emit::constants::{CODE_SECTION, DATA_SECTION, HEADER_COMMENT, TRAILER_COMMENT};
use crate::emit::data;
use crate::errors::Warning;
use crate::ir::{IrContainer, ObjectKind};
use crate::target::Mode;

/// One routine's block-count/peak-temp-count summary, written to the
/// companion `.dbg` trace file when the CLI's `-d` flag is set.
pub struct RoutineTrace {
    pub name: String,
    pub block_count: usize,
    pub peak_temp_count: u32,
}

pub struct GenerateOutput {
    pub assembly: String,
    pub warnings: Vec<Warning>,
    pub traces: Vec<RoutineTrace>,
}

/// Runs the full pipeline over every routine in `container`, mutating it
/// in place (block-forming and liveness each rewrite a routine's
/// instruction stream; layout fills in every object's size), and returns
/// the generated assembler text together with every warning collected
/// along the way.
///
/// An empty container is not an error: it produces a header/trailer-only
/// file, matching the "nothing to emit" boundary case.
pub fn generate(container: &mut IrContainer, mode: Mode) -> Result<GenerateOutput> {
    let routine_ids: Vec<_> = container
        .iterate()
        .filter(|(_, o)| matches!(o.kind(), ObjectKind::Routine(_)))
        .map(|(id, _)| id)
        .collect();

    for &id in &routine_ids {
        let name = container.get(id).name().to_string();
        let routine = container
            .get_mut(id)
            .as_routine_mut()
            .expect("id was filtered to routine kind above");
        blocks::form_blocks(&name, routine).with_context(|| format!("Failed during block formation in {name}"))?;
    }

    for &id in &routine_ids {
        let name = container.get(id).name().to_string();
        liveness::run_on_routine(container, id).with_context(|| format!("Failed during liveness in {name}"))?;
    }

    let mut warnings = layout::run(container, mode).context("Failed during layout")?;

    let mut lines = vec![HEADER_COMMENT.to_string()];
    lines.extend(data::render_struct_layouts(container, mode).context("Failed during layout")?);
    lines.extend(data::render_visibility(container));
    lines.push(DATA_SECTION.to_string());
    lines.extend(data::render_data_section(container).context("Failed during emission")?);
    lines.push(CODE_SECTION.to_string());

    let mut traces = Vec::with_capacity(routine_ids.len());
    for &id in &routine_ids {
        let name = container.get(id).name().to_string();
        let (routine_lines, routine_warnings) =
            emit::emit_routine(container, id, mode).with_context(|| format!("Failed during emission in {name}"))?;

        let routine = container.get(id).as_routine().expect("id was filtered to routine kind above");
        traces.push(RoutineTrace {
            name,
            block_count: routine.blocks().len(),
            peak_temp_count: routine.peak_temp_count(),
        });

        lines.extend(routine_lines);
        warnings.extend(routine_warnings);
    }

    lines.push(TRAILER_COMMENT.to_string());

    Ok(GenerateOutput { assembly: lines.join("\n") + "\n", warnings, traces })
}
