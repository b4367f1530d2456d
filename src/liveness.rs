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

//! Backward, block-local liveness (§4.3): annotates every surviving
//! instruction's `used_next` bit and each operand occurrence's `live` bit,
//! and prunes instructions whose only result is a dead temporary.

use std::collections::HashSet;

use crate::errors::CoreError;
use crate::ir::{Block, IrContainer, ObjectId, OpcodeClass, StorageClass};

/// Runs liveness over every block of the routine named by `routine_id`,
/// mutating its blocks in place and recording the routine's peak
/// concurrent temp count for the layout pass.
pub fn run_on_routine(container: &mut IrContainer, routine_id: ObjectId) -> Result<(), CoreError> {
    let mut blocks = {
        let routine = container
            .get_mut(routine_id)
            .as_routine_mut()
            .expect("run_on_routine called on a non-routine object");
        std::mem::take(routine.blocks_mut())
    };

    let mut peak = 0u32;
    for block in blocks.iter_mut() {
        peak = peak.max(run_on_block(container, block)?);
    }

    let routine = container
        .get_mut(routine_id)
        .as_routine_mut()
        .expect("run_on_routine called on a non-routine object");
    routine.set_blocks(blocks);
    routine.set_peak_temp_count(peak);
    Ok(())
}

fn is_temp(container: &IrContainer, id: ObjectId) -> bool {
    container.try_get(id).map(|o| o.storage() == StorageClass::Temp).unwrap_or(false)
}

/// Walks one block back-to-front, returning the peak number of
/// simultaneously live temporaries observed in it.
fn run_on_block(container: &mut IrContainer, block: &mut Block) -> Result<u32, CoreError> {
    let mut arg1: Option<ObjectId> = None;
    let mut arg2: Option<ObjectId> = None;
    let mut live_temps: HashSet<ObjectId> = HashSet::new();
    let mut peak = 0u32;

    let mut i = block.instructions.len();
    while i > 0 {
        i -= 1;
        let class = block.instructions[i].opcode.class();

        match class {
            OpcodeClass::NoArg => {}

            OpcodeClass::NoResult => {
                let left_id = block.instructions[i].left.map(|s| s.object);
                if let Some(slot) = block.instructions[i].left.as_mut() {
                    slot.live = true;
                }
                block.instructions[i].used_next = false;
                if let Some(id) = left_id {
                    if is_temp(container, id) {
                        live_temps.insert(id);
                        peak = peak.max(live_temps.len() as u32);
                    }
                }
                arg1 = left_id;
                arg2 = None;
            }

            OpcodeClass::UnaryResult => {
                let result_id = block.instructions[i].result.map(|s| s.object);
                let is_live = result_id.is_some() && (result_id == arg1 || result_id == arg2);

                if let Some(rid) = result_id {
                    if is_temp(container, rid) && !is_live {
                        let name = container.get(rid).name().to_string();
                        container.remove(&name)?;
                        block.instructions.remove(i);
                        continue;
                    }
                }

                if let Some(rid) = result_id {
                    live_temps.remove(&rid);
                }
                let left_id = block.instructions[i].left.map(|s| s.object);
                if let Some(id) = left_id {
                    if is_temp(container, id) {
                        live_temps.insert(id);
                    }
                }
                peak = peak.max(live_temps.len() as u32);

                if let Some(slot) = block.instructions[i].result.as_mut() {
                    slot.live = false;
                }
                if let Some(slot) = block.instructions[i].left.as_mut() {
                    slot.live = true;
                }
                block.instructions[i].used_next = is_live;
                arg1 = left_id;
                arg2 = None;
            }

            OpcodeClass::BinaryResult => {
                let result_id = block.instructions[i].result.map(|s| s.object);
                let is_live = result_id.is_some() && (result_id == arg1 || result_id == arg2);

                if let Some(rid) = result_id {
                    if is_temp(container, rid) && !is_live {
                        let name = container.get(rid).name().to_string();
                        container.remove(&name)?;
                        block.instructions.remove(i);
                        continue;
                    }
                }

                if let Some(rid) = result_id {
                    live_temps.remove(&rid);
                }
                let left_id = block.instructions[i].left.map(|s| s.object);
                let right_id = block.instructions[i].right.map(|s| s.object);
                for id in [left_id, right_id].into_iter().flatten() {
                    if is_temp(container, id) {
                        live_temps.insert(id);
                    }
                }
                peak = peak.max(live_temps.len() as u32);

                if let Some(slot) = block.instructions[i].result.as_mut() {
                    slot.live = false;
                }
                if let Some(slot) = block.instructions[i].left.as_mut() {
                    slot.live = true;
                }
                if let Some(slot) = block.instructions[i].right.as_mut() {
                    slot.live = true;
                }
                block.instructions[i].used_next = is_live;
                arg1 = left_id;
                arg2 = right_id;
            }
        }
    }

    Ok(peak)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instruction, Object, ObjectKind, Opcode, Prime, RoutineObj};

    fn temp(container: &mut IrContainer, name: &str) -> ObjectId {
        container.add(Object::new(name, StorageClass::Temp, ObjectKind::Prime(Prime::new())).unwrap()).unwrap()
    }

    fn named(container: &mut IrContainer, name: &str, storage: StorageClass) -> ObjectId {
        container.add(Object::new(name, storage, ObjectKind::Prime(Prime::new())).unwrap()).unwrap()
    }

    #[test]
    fn dead_temp_is_pruned_and_deleted() {
        let mut c = IrContainer::new();
        let a = named(&mut c, "a", StorageClass::Public);
        let b = named(&mut c, "b", StorageClass::Public);
        let cc = named(&mut c, "c", StorageClass::Public);
        let d = named(&mut c, "d", StorageClass::Public);
        let r = named(&mut c, "rdst", StorageClass::Public);
        let t1 = temp(&mut c, "t1");
        let t2 = temp(&mut c, "t2");

        let mut routine = Object::new("main", StorageClass::Public, ObjectKind::Routine(RoutineObj::new())).unwrap();
        {
            let routine_obj = routine.as_routine_mut().unwrap();
            routine_obj.push_instruction(Instruction::new(Opcode::Mul, Some(t1), Some(a), Some(b)));
            routine_obj.push_instruction(Instruction::new(Opcode::Mul, Some(t2), Some(cc), Some(d)));
            routine_obj.push_instruction(Instruction::new(Opcode::Ass, Some(r), Some(t1), None));
            routine_obj.push_instruction(Instruction::new(Opcode::Rtrn, None, Some(r), None));
        }
        let rid = c.add(routine).unwrap();
        crate::blocks::form_blocks("main", c.get_mut(rid).as_routine_mut().unwrap()).unwrap();

        run_on_routine(&mut c, rid).unwrap();

        assert!(c.find_opt("t2").is_none(), "dead temp t2 should have been deleted");
        assert!(c.find_opt("t1").is_some());
        let routine = c.get(rid).as_routine().unwrap();
        let all: Vec<Opcode> =
            routine.blocks().iter().flat_map(|b| b.instructions.iter().map(|i| i.opcode)).collect();
        assert_eq!(all, vec![Opcode::Mul, Opcode::Ass, Opcode::Rtrn]);
    }

    #[test]
    fn used_next_reflects_same_block_reuse() {
        let mut c = IrContainer::new();
        let a = named(&mut c, "a", StorageClass::Public);
        let b = named(&mut c, "b", StorageClass::Public);
        let t = temp(&mut c, "t");

        let mut routine = Object::new("main", StorageClass::Public, ObjectKind::Routine(RoutineObj::new())).unwrap();
        {
            let routine_obj = routine.as_routine_mut().unwrap();
            routine_obj.push_instruction(Instruction::new(Opcode::Add, Some(t), Some(a), Some(b)));
            routine_obj.push_instruction(Instruction::new(Opcode::Ass, Some(a), Some(t), None));
            routine_obj.push_instruction(Instruction::new(Opcode::Rtrn, None, Some(a), None));
        }
        let rid = c.add(routine).unwrap();
        crate::blocks::form_blocks("main", c.get_mut(rid).as_routine_mut().unwrap()).unwrap();
        run_on_routine(&mut c, rid).unwrap();

        let routine = c.get(rid).as_routine().unwrap();
        let instrs = &routine.blocks()[0].instructions;
        assert_eq!(instrs.len(), 3);
        assert!(instrs[0].used_next, "t is consumed by the very next instruction");
    }
}
