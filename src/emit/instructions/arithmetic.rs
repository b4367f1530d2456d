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
use crate::emit::operand::{operand_width, resolve_home, resolve_source};
use crate::emit::register::Register;
use crate::emit::EmitCtx;
use crate::errors::CoreError;
use crate::ir::{Instruction, IrContainer, ObjectId};

fn slot(_instr: &Instruction, name: &'static str, which: Option<crate::ir::OperandSlot>) -> Result<ObjectId, CoreError> {
    which
        .map(|s| s.object)
        .ok_or_else(|| CoreError::InvalidConstruction { reason: format!("{name} instruction is missing an operand") })
}

/// `inc`/`dec(x)` — single-operand in place, directly at `x`'s home when
/// it's memory-backed, otherwise on the register already holding it.
pub fn emit_inc_dec(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction, mnemonic: &str) -> Result<(), CoreError> {
    let x = slot(instr, "inc/dec", instr.result)?;
    if let Some(reg) = ctx.registers.find_value(x) {
        let width = operand_width(container, ctx.mode, x)?;
        ctx.emit_instr(format!("{mnemonic} {}", register_name(reg, width, ctx.mode)));
    } else {
        let home = resolve_home(container, &ctx.frame, ctx.mode, x)?;
        ctx.emit_instr(format!("{mnemonic} [{home}]"));
    }
    Ok(())
}

/// `neg(result, x)` — load into the accumulator, negate, record result.
pub fn emit_neg(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let x = slot(instr, "neg", instr.left)?;
    let width = operand_width(container, ctx.mode, x)?;
    ctx.load(container, Register::Accumulator, x)?;
    ctx.emit_instr(format!("neg {}", register_name(Register::Accumulator, width, ctx.mode)));
    ctx.finish_result(container, instr, Register::Accumulator)
}

/// `add`/`sub(r, l, rhs)` — load `l` into the accumulator, resolve `rhs`
/// in place, emit the op with the accumulator as both source and
/// destination, record `r` there.
pub fn emit_binary(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction, mnemonic: &str) -> Result<(), CoreError> {
    let left = slot(instr, mnemonic, instr.left)?;
    let right = slot(instr, mnemonic, instr.right)?;
    let width = operand_width(container, ctx.mode, left)?;
    ctx.load(container, Register::Accumulator, left)?;
    let rhs_text = resolve_source(container, &ctx.frame, &ctx.registers, ctx.mode, right)?;
    ctx.emit_instr(format!("{mnemonic} {}, {rhs_text}", register_name(Register::Accumulator, width, ctx.mode)));
    ctx.finish_result(container, instr, Register::Accumulator)
}

/// `mul(r, l, rhs)` — signed or unsigned form chosen from the union of
/// both operands' signedness; the machine sets the overflow flag and
/// nothing here inspects it.
pub fn emit_mul(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let left = slot(instr, "mul", instr.left)?;
    let right = slot(instr, "mul", instr.right)?;
    let signed = container.get(left).as_prime().map(|p| p.is_signed()).unwrap_or(false)
        || container.get(right).as_prime().map(|p| p.is_signed()).unwrap_or(false);
    let width = operand_width(container, ctx.mode, left)?;
    ctx.load(container, Register::Accumulator, left)?;
    let rhs_text = resolve_source(container, &ctx.frame, &ctx.registers, ctx.mode, right)?;
    if signed {
        ctx.emit_instr(format!("imul {}, {rhs_text}", register_name(Register::Accumulator, width, ctx.mode)));
    } else {
        // `mul` has no 2-operand encoding: the implicit destination is
        // always the accumulator, widened into the data register.
        ctx.emit_instr(format!("mul {rhs_text}"));
    }
    ctx.finish_result(container, instr, Register::Accumulator)
}

/// `div`/`mod(r, l, rhs)` — numerator into the accumulator, data register
/// cleared to hold the high half, signed or unsigned divide; the quotient
/// lands in the accumulator (`div`), the remainder in the data register
/// (`mod`).
pub fn emit_divmod(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction, is_div: bool) -> Result<(), CoreError> {
    let left = slot(instr, "div/mod", instr.left)?;
    let right = slot(instr, "div/mod", instr.right)?;
    let signed = container.get(left).as_prime().map(|p| p.is_signed()).unwrap_or(false);
    let width = operand_width(container, ctx.mode, left)?;

    ctx.load(container, Register::Accumulator, left)?;
    ctx.stash(container, Register::Data)?;
    if signed {
        ctx.emit_instr(match width {
            1 => "cbw".to_string(),
            2 => "cwd".to_string(),
            4 => "cdq".to_string(),
            _ => "cqo".to_string(),
        });
    } else {
        ctx.emit_instr(format!("xor {}, {}", register_name(Register::Data, width, ctx.mode), register_name(Register::Data, width, ctx.mode)));
    }

    let rhs_text = resolve_source(container, &ctx.frame, &ctx.registers, ctx.mode, right)?;
    let mnemonic = if signed { "idiv" } else { "div" };
    ctx.emit_instr(format!("{mnemonic} {rhs_text}"));

    let result_reg = if is_div { Register::Accumulator } else { Register::Data };
    ctx.registers.clear_one(Register::Accumulator);
    ctx.registers.clear_one(Register::Data);
    ctx.finish_result(container, instr, result_reg)
}
