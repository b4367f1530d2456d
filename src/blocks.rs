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

//! Partitions a routine's linear instruction stream into basic blocks.

use crate::errors::CoreError;
use crate::ir::{Block, Instruction, RoutineObj};

/// Drains `routine`'s raw instruction stream into basic blocks using the
/// leader rules of §4.2: the first instruction, every label, and every
/// instruction immediately following a terminator starts a new block.
pub fn form_blocks(routine_name: &str, routine: &mut RoutineObj) -> Result<(), CoreError> {
    let raw = routine.take_raw_instructions();
    if raw.is_empty() {
        return Err(CoreError::EmptyRoutine(routine_name.to_string()));
    }

    let mut blocks: Vec<Block> = Vec::new();
    let mut current = Block::new();
    let mut after_terminator = false;

    for (i, instr) in raw.into_iter().enumerate() {
        let is_leader = i == 0 || instr.opcode.is_label() || after_terminator;
        if is_leader && !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
        }
        after_terminator = instr.opcode.is_terminator();
        push_instruction(&mut current, instr);
        if after_terminator {
            blocks.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    routine.set_blocks(blocks);
    Ok(())
}

fn push_instruction(block: &mut Block, instr: Instruction) {
    block.instructions.push(instr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Opcode, RoutineObj};

    fn instr(opcode: Opcode) -> Instruction {
        Instruction::new(opcode, None, None, None)
    }

    #[test]
    fn empty_routine_is_an_error() {
        let mut r = RoutineObj::new();
        let err = form_blocks("main", &mut r).unwrap_err();
        assert_eq!(err, CoreError::EmptyRoutine("main".to_string()));
    }

    #[test]
    fn label_and_terminator_split_blocks() {
        let mut r = RoutineObj::new();
        r.push_instruction(instr(Opcode::Nop));
        r.push_instruction(instr(Opcode::Jmp));
        r.push_instruction(instr(Opcode::Lbl));
        r.push_instruction(instr(Opcode::Rtrn));
        form_blocks("main", &mut r).unwrap();
        let blocks = r.blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].instructions.len(), 2);
        assert_eq!(blocks[1].instructions.len(), 2);
    }

    #[test]
    fn straight_line_routine_is_one_block() {
        let mut r = RoutineObj::new();
        r.push_instruction(instr(Opcode::Nop));
        r.push_instruction(instr(Opcode::Nop));
        r.push_instruction(instr(Opcode::Rtrn));
        form_blocks("main", &mut r).unwrap();
        assert_eq!(r.blocks().len(), 1);
        assert_eq!(r.blocks()[0].instructions.len(), 3);
    }

    #[test]
    fn call_ends_a_block() {
        let mut r = RoutineObj::new();
        r.push_instruction(instr(Opcode::Call));
        r.push_instruction(instr(Opcode::Nop));
        form_blocks("main", &mut r).unwrap();
        assert_eq!(r.blocks().len(), 2);
    }

    #[test]
    fn blocks_are_never_empty() {
        let mut r = RoutineObj::new();
        r.push_instruction(instr(Opcode::Lbl));
        r.push_instruction(instr(Opcode::Lbl));
        r.push_instruction(instr(Opcode::Rtrn));
        form_blocks("main", &mut r).unwrap();
        assert!(r.blocks().iter().all(|b| !b.is_empty()));
    }
}
