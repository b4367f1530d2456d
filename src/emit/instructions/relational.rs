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

use crate::emit::constants::register_name;
use crate::emit::operand::{operand_width, resolve_source};
use crate::emit::register::Register;
use crate::emit::EmitCtx;
use crate::errors::CoreError;
use crate::ir::{Instruction, IrContainer, ObjectId};

fn slot(name: &'static str, which: Option<crate::ir::OperandSlot>) -> Result<ObjectId, CoreError> {
    which
        .map(|s| s.object)
        .ok_or_else(|| CoreError::InvalidConstruction { reason: format!("{name} instruction is missing an operand") })
}

/// `eq`/`neq`/`lt`/`gt`/`lte`/`gte(r, l, rhs)` — `CMP` the two operands and
/// materialise the boolean into the low byte of the result via the
/// matching `SETcc`, zero-extending the rest of the accumulator first.
pub fn emit_compare(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction, setcc: &str) -> Result<(), CoreError> {
    let left = slot("compare", instr.left)?;
    let right = slot("compare", instr.right)?;
    let width = operand_width(container, ctx.mode, left)?;

    ctx.load(container, Register::Accumulator, left)?;
    let rhs_text = resolve_source(container, &ctx.frame, &ctx.registers, ctx.mode, right)?;
    ctx.emit_instr(format!("cmp {}, {rhs_text}", register_name(Register::Accumulator, width, ctx.mode)));
    ctx.emit_instr(format!("{setcc} {}", register_name(Register::Accumulator, 1, ctx.mode)));
    if width > 1 {
        ctx.emit_instr(format!(
            "movzx {}, {}",
            register_name(Register::Accumulator, width, ctx.mode),
            register_name(Register::Accumulator, 1, ctx.mode)
        ));
    }
    ctx.finish_result(container, instr, Register::Accumulator)
}
