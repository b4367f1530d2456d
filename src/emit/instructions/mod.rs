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

//! Per-opcode emission (§4.5.5), split by category the way the teacher's
//! byte encoder is split — arithmetic, bitwise, control flow, load/store,
//! and the handful that don't fit any of those.

mod arithmetic;
mod bitwise;
mod control_flow;
mod load_store;
mod misc;
mod relational;

use crate::emit::EmitCtx;
use crate::errors::CoreError;
use crate::ir::{Instruction, IrContainer, Opcode};

pub fn emit_instruction(ctx: &mut EmitCtx, container: &IrContainer, instr: &Instruction) -> Result<(), CoreError> {
    match instr.opcode {
        Opcode::Nop => Ok(()),
        Opcode::Proc => Ok(()),
        Opcode::Ass => load_store::emit_ass(ctx, container, instr),
        Opcode::Ref => load_store::emit_ref(ctx, container, instr),
        Opcode::Dref => load_store::emit_dref(ctx, container, instr),
        Opcode::Cpy => load_store::emit_cpy(ctx, container, instr),

        Opcode::Inc => arithmetic::emit_inc_dec(ctx, container, instr, "inc"),
        Opcode::Dec => arithmetic::emit_inc_dec(ctx, container, instr, "dec"),
        Opcode::Neg => arithmetic::emit_neg(ctx, container, instr),
        Opcode::Add => arithmetic::emit_binary(ctx, container, instr, "add"),
        Opcode::Sub => arithmetic::emit_binary(ctx, container, instr, "sub"),
        Opcode::Mul => arithmetic::emit_mul(ctx, container, instr),
        Opcode::Div => arithmetic::emit_divmod(ctx, container, instr, true),
        Opcode::Mod => arithmetic::emit_divmod(ctx, container, instr, false),

        Opcode::Not => bitwise::emit_not(ctx, container, instr),
        Opcode::Inv => bitwise::emit_not(ctx, container, instr),
        Opcode::Band => bitwise::emit_binary(ctx, container, instr, "and"),
        Opcode::Bor => bitwise::emit_binary(ctx, container, instr, "or"),
        Opcode::Xor => bitwise::emit_binary(ctx, container, instr, "xor"),
        Opcode::Lsh => bitwise::emit_shift(ctx, container, instr, "shl"),
        Opcode::Rsh => bitwise::emit_shift(ctx, container, instr, "shr"),
        Opcode::Rol => bitwise::emit_shift(ctx, container, instr, "rol"),
        Opcode::Ror => bitwise::emit_shift(ctx, container, instr, "ror"),

        Opcode::Eq => relational::emit_compare(ctx, container, instr, "sete"),
        Opcode::Neq => relational::emit_compare(ctx, container, instr, "setne"),
        Opcode::Lt => relational::emit_compare(ctx, container, instr, "setl"),
        Opcode::Gt => relational::emit_compare(ctx, container, instr, "setg"),
        Opcode::Lte => relational::emit_compare(ctx, container, instr, "setle"),
        Opcode::Gte => relational::emit_compare(ctx, container, instr, "setge"),
        // Booleans are already normalised to 0/1 by construction, so the
        // logical connectives are just the bitwise ones.
        Opcode::And => bitwise::emit_binary(ctx, container, instr, "and"),
        Opcode::Or => bitwise::emit_binary(ctx, container, instr, "or"),

        Opcode::Lbl => control_flow::emit_lbl(ctx, container, instr),
        Opcode::Jmp => control_flow::emit_jmp(ctx, container, instr),
        Opcode::Jz => control_flow::emit_jz(ctx, container, instr),
        Opcode::Loop => control_flow::emit_loop(ctx, container, instr),
        Opcode::Call => control_flow::emit_call(ctx, container, instr),
        Opcode::Rtrn => control_flow::emit_rtrn(ctx, container, instr),
        Opcode::Parm => control_flow::emit_parm(ctx, container, instr),

        Opcode::Sz => misc::emit_sz(ctx, container, instr),
    }
}
