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
use crate::emit::operand::{array_element_size, lea_scale, operand_width, resolve_home, resolve_source};
use crate::emit::register::Register;
use crate::emit::EmitCtx;
use crate::errors::CoreError;
use crate::ir::{Instruction, IrContainer};

fn operand(instr: &Instruction, slot: &str) -> Result<crate::ir::ObjectId, CoreError> {
    let s = match slot {
        "result" => instr.result,
        "left" => instr.left,
        "right" => instr.right,
        _ => unreachable!(),
    };
    s.map(|o| o.object)
        .ok_or_else(|| CoreError::InvalidConstruction { reason: format!("instruction is missing its {slot} operand") })
}

/// `ass(dest, src)` — `MOV` for two primitives, a byte copy staged through
/// `si`/`di` otherwise. Memory-to-memory moves of a primitive are staged
/// through the accumulator by `load`/`store`, never emitted directly.
pub fn emit_ass(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let dest = operand(instr, "result")?;
    let src = operand(instr, "left")?;
    let dest_obj = container.get(dest);
    let src_obj = container.get(src);

    match (dest_obj.as_prime(), src_obj.as_prime()) {
        (Some(dp), Some(sp)) => {
            if dest_obj.size() != src_obj.size() {
                ctx.warn(dest_obj.name(), "size mismatch between assignment operands");
            }
            if dp.is_signed() != sp.is_signed() {
                ctx.warn(dest_obj.name(), "signedness mismatch between assignment operands");
            }
            ctx.load(container, Register::Accumulator, src)?;
            ctx.finish_result(container, instr, Register::Accumulator)?;
        }
        _ => byte_copy(ctx, container, dest, src)?,
    }
    Ok(())
}

fn byte_copy(ctx: &mut EmitCtx, container: &IrContainer, dest: crate::ir::ObjectId, src: crate::ir::ObjectId) -> Result<(), CoreError> {
    let size = container
        .get(dest)
        .size()
        .ok_or_else(|| CoreError::InvalidConstruction { reason: format!("{}: size not computed", container.get(dest).name()) })?;
    let ptr_w = ctx.mode.pointer_width();
    let src_home = resolve_home(container, &ctx.frame, ctx.mode, src)?;
    let dest_home = resolve_home(container, &ctx.frame, ctx.mode, dest)?;
    ctx.emit_instr(format!("lea {}, [{src_home}]", register_name(Register::SourceIndex, ptr_w, ctx.mode)));
    ctx.emit_instr(format!("lea {}, [{dest_home}]", register_name(Register::DestIndex, ptr_w, ctx.mode)));
    ctx.emit_instr(format!("mov {}, {size}", register_name(Register::Counter, ptr_w, ctx.mode)));
    ctx.emit_instr("rep movsb");
    ctx.registers.clear_one(Register::SourceIndex);
    ctx.registers.clear_one(Register::DestIndex);
    ctx.registers.clear_one(Register::Counter);
    Ok(())
}

/// `ref(r, obj, idx?)` — effective address of `obj` (optionally indexed)
/// into the source-index register. The address itself *is* `r`'s value
/// (a later `dref` dereferences it explicitly), so it is recorded as a
/// plain value occupant, not a cached reference — flushing it to `r`'s
/// home, if one is needed, writes the pointer, not the pointee. Scalars
/// need no index; arrays and structs combine with it via `LEA`'s scale
/// factor when the element size is 1/2/4/8, else an explicit multiply
/// first.
pub fn emit_ref(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let result = operand(instr, "result")?;
    let base = operand(instr, "left")?;
    let ptr_w = ctx.mode.pointer_width();
    let si = register_name(Register::SourceIndex, ptr_w, ctx.mode);

    match instr.right {
        None => {
            let home = resolve_home(container, &ctx.frame, ctx.mode, base)?;
            ctx.emit_instr(format!("lea {si}, [{home}]"));
        }
        Some(idx_slot) => {
            let idx = idx_slot.object;
            let elem_size = array_element_size(container, base)?;
            let home = resolve_home(container, &ctx.frame, ctx.mode, base)?;
            match lea_scale(elem_size) {
                Some(scale) => {
                    let idx_text = resolve_source(container, &ctx.frame, &ctx.registers, ctx.mode, idx)?;
                    if idx_text.parse::<i64>().is_ok() {
                        ctx.emit_instr(format!("lea {si}, [{home}+{idx_text}*{scale}]"));
                    } else {
                        ctx.load(container, Register::Counter, idx)?;
                        let counter = register_name(Register::Counter, ptr_w, ctx.mode);
                        ctx.emit_instr(format!("lea {si}, [{home}+{counter}*{scale}]"));
                    }
                }
                None => {
                    ctx.load(container, Register::Counter, idx)?;
                    let counter = register_name(Register::Counter, ptr_w, ctx.mode);
                    ctx.emit_instr(format!("imul {counter}, {counter}, {elem_size}"));
                    ctx.emit_instr(format!("lea {si}, [{home}+{counter}]"));
                }
            }
        }
    }
    ctx.registers.set_value(Register::SourceIndex, result);
    ctx.finish_result(container, instr, Register::SourceIndex)
}

/// `dref(r, ptr)` — load the pointer into the accumulator, then read
/// through it into the accumulator.
pub fn emit_dref(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let result = operand(instr, "result")?;
    let ptr = operand(instr, "left")?;
    let width = operand_width(container, ctx.mode, result)?;
    ctx.load(container, Register::Accumulator, ptr)?;
    let acc_ptr = register_name(Register::Accumulator, ctx.mode.pointer_width(), ctx.mode);
    let acc = register_name(Register::Accumulator, width, ctx.mode);
    ctx.emit_instr(format!("mov {acc}, [{acc_ptr}]"));
    ctx.finish_result(container, instr, Register::Accumulator)?;
    Ok(())
}

/// `cpy(dest, src)` — an explicit byte copy regardless of operand kind,
/// used by the front end when it already knows a field-by-field `ass`
/// would be wrong (e.g. copying through a `void`-typed buffer).
pub fn emit_cpy(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    let dest = operand(instr, "result")?;
    let src = operand(instr, "left")?;
    byte_copy(ctx, container, dest, src)
}
