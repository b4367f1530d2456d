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
use crate::emit::register::Register;
use crate::emit::EmitCtx;
use crate::errors::CoreError;
use crate::ir::{Instruction, IrContainer, ObjectId};

fn slot(name: &'static str, which: Option<crate::ir::OperandSlot>) -> Result<ObjectId, CoreError> {
    which
        .map(|s| s.object)
        .ok_or_else(|| CoreError::InvalidConstruction { reason: format!("{name} instruction is missing an operand") })
}

/// `lbl(x)` — emitted on a line of its own, no indentation.
pub fn emit_lbl(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let x = slot("lbl", instr.left)?;
    ctx.emit(format!("{}:", container.get(x).name()));
    Ok(())
}

/// `jmp(target)` — direct jump by label name.
pub fn emit_jmp(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let target = slot("jmp", instr.left)?;
    ctx.emit_instr(format!("jmp {}", container.get(target).name()));
    Ok(())
}

/// `jz(cond, target)` — the condition is tested first, then a conditional
/// jump on zero.
pub fn emit_jz(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let cond = slot("jz", instr.left)?;
    let target = slot("jz", instr.right)?;
    let width = crate::emit::operand::operand_width(container, ctx.mode, cond)?;
    ctx.load(container, Register::Accumulator, cond)?;
    ctx.emit_instr(format!("test {0}, {0}", register_name(Register::Accumulator, width, ctx.mode)));
    ctx.emit_instr(format!("jz {}", container.get(target).name()));
    Ok(())
}

/// `loop(cond, target)` — same shape as `jz` but jumps while the condition
/// is still true (non-zero).
pub fn emit_loop(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let cond = slot("loop", instr.left)?;
    let target = slot("loop", instr.right)?;
    let width = crate::emit::operand::operand_width(container, ctx.mode, cond)?;
    ctx.load(container, Register::Accumulator, cond)?;
    ctx.emit_instr(format!("test {0}, {0}", register_name(Register::Accumulator, width, ctx.mode)));
    ctx.emit_instr(format!("jnz {}", container.get(target).name()));
    Ok(())
}

/// `parm(x)` — pushes one argument; the front end is required to emit
/// these immediately before the matching `call`, in reverse parameter
/// order, so the callee can index them as `BP + 2W + i*W`.
pub fn emit_parm(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let arg = slot("parm", instr.left)?;
    let text = crate::emit::operand::resolve_source(container, &ctx.frame, &ctx.registers, ctx.mode, arg)?;
    ctx.emit_instr(format!("push {text}"));
    Ok(())
}

/// `call(r, proc)` — parameters are assumed already pushed by preceding
/// `parm`s; the callee's own `ret N` unwinds them. The result comes back
/// in the accumulator. Ends the basic block (§4.2): the descriptor is
/// already empty by the time we get here, since the block former split
/// right after this instruction.
pub fn emit_call(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let proc = slot("call", instr.left)?;
    ctx.registers.clear_all();
    ctx.emit_instr(format!("call {}", container.get(proc).name()));
    if let Some(result) = instr.result {
        ctx.registers.set_value(Register::Accumulator, result.object);
        if !instr.used_next {
            if container.get(result.object).storage() == crate::ir::StorageClass::Temp {
                ctx.stash(container, Register::Accumulator)?;
            } else {
                ctx.store(container, Register::Accumulator)?;
                ctx.registers.clear_one(Register::Accumulator);
            }
        }
    }
    Ok(())
}

/// `rtrn(value?)` — load the return value into the accumulator if there is
/// one, tear down the frame, and unwind the caller's pushed parameters.
pub fn emit_rtrn(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    if let Some(value) = instr.left {
        ctx.load(container, Register::Accumulator, value.object)?;
    }
    ctx.emit_instr("leave");
    ctx.emit_instr(format!("ret {}", ctx.frame.param_bytes()));
    Ok(())
}
