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

//! The emitter: turns a laid-out, liveness-clean routine into NASM text.
//! [`EmitCtx`] bundles the mutable state one routine's emission threads
//! through (register descriptor, frame, output buffer, warnings) so no
//! function here reaches for global state.

pub mod constants;
pub mod data;
pub mod frame;
pub mod instructions;
pub mod operand;
pub mod register;

use crate::emit::constants::register_name;
use crate::emit::frame::Frame;
use crate::emit::operand::{operand_width, resolve_home, resolve_source};
use crate::emit::register::{Occupancy, Register, RegisterDescriptor};
use crate::errors::{CoreError, Warning};
use crate::ir::{Instruction, IrContainer, ObjectId, StorageClass};
use crate::target::Mode;

/// Emits one routine's prologue, body, and per-block register flushes.
/// Returns the assembler lines and any warnings collected along the way.
/// The caller is responsible for the surrounding section headers and for
/// running block-forming and liveness on the routine first.
pub fn emit_routine(container: &IrContainer, routine_id: ObjectId, mode: Mode) -> Result<(Vec<String>, Vec<Warning>), CoreError> {
    let routine = container.get(routine_id).as_routine().ok_or_else(|| CoreError::BadCast {
        context: container.get(routine_id).name().to_string(),
        expected: "routine",
    })?;
    let frame = Frame::build(container, routine, mode)?;
    let mut ctx = EmitCtx::new(mode, frame);

    ctx.emit(format!("{}:", container.get(routine_id).name()));
    ctx.emit_instr(format!("enter {}, 0", ctx.frame.frame_size()));

    for block in routine.blocks() {
        for instr in &block.instructions {
            instructions::emit_instruction(&mut ctx, container, instr)?;
        }
        ctx.flush_block_boundary(container)?;
    }

    Ok((ctx.lines, ctx.warnings))
}

pub struct EmitCtx {
    pub mode: Mode,
    pub registers: RegisterDescriptor,
    pub frame: Frame,
    pub lines: Vec<String>,
    pub warnings: Vec<Warning>,
}

const PASS: &str = "emit";

impl EmitCtx {
    pub fn new(mode: Mode, frame: Frame) -> Self {
        Self {
            mode,
            registers: RegisterDescriptor::new(),
            frame,
            lines: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn emit(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn emit_instr(&mut self, line: impl Into<String>) {
        self.lines.push(format!("    {}", line.into()));
    }

    pub fn warn(&mut self, object: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Warning::on(PASS, object, message));
    }

    fn width_of(&self, container: &IrContainer, id: ObjectId) -> Result<u32, CoreError> {
        operand_width(container, self.mode, id)
    }

    fn name_of(&self, reg: Register, width: u32) -> String {
        register_name(reg, width, self.mode)
    }

    /// Ensures `reg` holds `src`'s value, emitting whatever instruction is
    /// needed to get it there (§4.5.4 `Load`).
    pub fn load(&mut self, container: &IrContainer, reg: Register, src: ObjectId) -> Result<(), CoreError> {
        if self.registers.find_value(src) == Some(reg) {
            return Ok(());
        }
        if let Some(other) = self.registers.find_value(src) {
            let width = self.width_of(container, src)?;
            self.emit_instr(format!("xchg {}, {}", self.name_of(reg, width), self.name_of(other, width)));
            self.registers.exchange(reg, other);
            return Ok(());
        }
        if !self.registers.is_empty_reg(reg) {
            self.stash(container, reg)?;
        }
        let width = self.width_of(container, src)?;
        let text = resolve_source(container, &self.frame, &self.registers, self.mode, src)?;
        self.emit_instr(format!("mov {}, {text}", self.name_of(reg, width)));
        self.registers.set_value(reg, src);
        Ok(())
    }

    /// Moves `reg`'s live temporary somewhere safe without storing it to a
    /// home location (it has none): a free scratch register if one exists,
    /// else a reserved stack slot in the frame's temp region (§4.5.4
    /// `Stash`). A no-op if `reg` is empty or holds a non-temp.
    pub fn stash(&mut self, container: &IrContainer, reg: Register) -> Result<(), CoreError> {
        let Some((obj_id, occupancy)) = self.registers.occupant(reg) else {
            return Ok(());
        };
        if container.get(obj_id).storage() != StorageClass::Temp {
            self.registers.clear_one(reg);
            return Ok(());
        }

        let width = self.width_of(container, obj_id)?;
        let pool = Register::scratch_pool(self.mode == Mode::Long);
        if let Some(&free) = pool.iter().find(|&&r| r != reg && self.registers.is_empty_reg(r)) {
            self.emit_instr(format!("mov {}, {}", self.name_of(free, width), self.name_of(reg, width)));
            match occupancy {
                Occupancy::Value => self.registers.set_value(free, obj_id),
                Occupancy::Reference => self.registers.set_reference(free, obj_id),
            }
            self.registers.clear_one(reg);
            return Ok(());
        }

        self.frame.reserve_spill(obj_id);
        let home = resolve_home(container, &self.frame, self.mode, obj_id)?;
        self.emit_instr(format!("mov [{home}], {}", self.name_of(reg, width)));
        self.registers.clear_one(reg);
        Ok(())
    }

    /// Writes `reg`'s value back to its operand's home location, if that
    /// operand is memory-backed (§4.5.4 `Store`). Leaves the descriptor
    /// alone; the caller clears it if the register is about to be reused.
    pub fn store(&mut self, container: &IrContainer, reg: Register) -> Result<(), CoreError> {
        let Some((obj_id, occupancy)) = self.registers.occupant(reg) else {
            return Ok(());
        };
        if occupancy != Occupancy::Value {
            return Ok(());
        }
        let storage = container.get(obj_id).storage();
        if matches!(storage, StorageClass::Temp | StorageClass::Const) {
            return Ok(());
        }
        let width = self.width_of(container, obj_id)?;
        let home = resolve_home(container, &self.frame, self.mode, obj_id)?;
        self.emit_instr(format!("mov [{home}], {}", self.name_of(reg, width)));
        Ok(())
    }

    /// The post-instruction bookkeeping common to every opcode with a
    /// result operand: when `used_next` is false the result is either
    /// pushed out of the way (temp, possibly needed by a later block) or
    /// written to its home (everything else).
    pub fn finish_result(&mut self, container: &IrContainer, instr: &Instruction, reg: Register) -> Result<(), CoreError> {
        let Some(slot) = instr.result else { return Ok(()) };
        self.registers.set_value(reg, slot.object);
        if !instr.used_next {
            if container.get(slot.object).storage() == StorageClass::Temp {
                self.stash(container, reg)?;
            } else {
                self.store(container, reg)?;
                self.registers.clear_one(reg);
            }
        }
        Ok(())
    }

    /// Flushes every register holding a memory-backed object before a
    /// block falls through to the next, and clears the descriptor — no
    /// register state threads across a block boundary (§4.5.1).
    pub fn flush_block_boundary(&mut self, container: &IrContainer) -> Result<(), CoreError> {
        let regs: Vec<Register> = self.registers.occupied_registers().collect();
        for reg in regs {
            self.store(container, reg)?;
        }
        self.registers.clear_all();
        Ok(())
    }
}
