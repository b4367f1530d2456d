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

/// `not`/`inv(result, x)` — load, complement, record result. `not` is the
/// logical complement and `inv` the bitwise one; both are `NOT` at the
/// machine level once operands are already normalised to 0/1 or raw bits.
pub fn emit_not(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let x = slot("not/inv", instr.left)?;
    let width = operand_width(container, ctx.mode, x)?;
    ctx.load(container, Register::Accumulator, x)?;
    ctx.emit_instr(format!("not {}", register_name(Register::Accumulator, width, ctx.mode)));
    ctx.finish_result(container, instr, Register::Accumulator)
}

/// `band`/`bor`/`xor(r, l, rhs)` — same binary pattern as arithmetic.
pub fn emit_binary(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction, mnemonic: &str) -> Result<(), CoreError> {
    let left = slot(mnemonic, instr.left)?;
    let right = slot(mnemonic, instr.right)?;
    let width = operand_width(container, ctx.mode, left)?;
    ctx.load(container, Register::Accumulator, left)?;
    let rhs_text = resolve_source(container, &ctx.frame, &ctx.registers, ctx.mode, right)?;
    ctx.emit_instr(format!("{mnemonic} {}, {rhs_text}", register_name(Register::Accumulator, width, ctx.mode)));
    ctx.finish_result(container, instr, Register::Accumulator)
}

/// `lsh`/`rsh`/`rol`/`ror(r, l, count)` — immediate form when `count` is a
/// compile-time constant, otherwise the count is loaded into the counter
/// register first (the only register the shift instructions accept a
/// variable count from).
pub fn emit_shift(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction, mnemonic: &str) -> Result<(), CoreError> {
    let left = slot(mnemonic, instr.left)?;
    let count = slot(mnemonic, instr.right)?;
    let width = operand_width(container, ctx.mode, left)?;
    ctx.load(container, Register::Accumulator, left)?;

    let is_const = container.get(count).storage() == crate::ir::StorageClass::Const;
    let count_text = if is_const {
        resolve_source(container, &ctx.frame, &ctx.registers, ctx.mode, count)?
    } else {
        ctx.load(container, Register::Counter, count)?;
        "cl".to_string()
    };

    ctx.emit_instr(format!("{mnemonic} {}, {count_text}", register_name(Register::Accumulator, width, ctx.mode)));
    ctx.finish_result(container, instr, Register::Accumulator)
}
