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
use crate::emit::operand::operand_width;
use crate::emit::register::Register;
use crate::emit::EmitCtx;
use crate::errors::CoreError;
use crate::ir::{Instruction, IrContainer, ObjectId};

fn slot(name: &'static str, which: Option<crate::ir::OperandSlot>) -> Result<ObjectId, CoreError> {
    which
        .map(|s| s.object)
        .ok_or_else(|| CoreError::InvalidConstruction { reason: format!("{name} instruction is missing an operand") })
}

/// `sz(r, obj)` — a compile-time constant: the object's byte count,
/// zero-extended into the accumulator. Fails if layout never ran.
pub fn emit_sz(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let obj = slot("sz", instr.left)?;
    let size = container
        .get(obj)
        .size()
        .ok_or_else(|| CoreError::InvalidConstruction { reason: format!("{}: size not yet computed", container.get(obj).name()) })?;
    let width = operand_width(container, ctx.mode, slot("sz", instr.result)?)?;
    ctx.emit_instr(format!("mov {}, {size}", register_name(Register::Accumulator, width, ctx.mode)));
    ctx.finish_result(container, instr, Register::Accumulator)
}
