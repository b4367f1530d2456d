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

//! Activation-record layout (§4.5.2): where parameters, automatics, and
//! spilled temporaries live relative to the base pointer.

use std::collections::HashMap;

use crate::errors::CoreError;
use crate::ir::{IrContainer, ObjectId, RoutineObj};
use crate::target::Mode;

#[derive(Debug)]
pub struct Frame {
    pointer_width: u32,
    param_bytes: u32,
    frame_size: u32,
    param_offsets: HashMap<ObjectId, u32>,
    auto_offsets: HashMap<ObjectId, u32>,
    spill_slots: HashMap<ObjectId, u32>,
    spill_base: u32,
    spill_capacity: u32,
    next_spill: u32,
}

impl Frame {
    pub fn build(container: &IrContainer, routine: &RoutineObj, mode: Mode) -> Result<Self, CoreError> {
        let w = mode.pointer_width();

        let mut param_offsets = HashMap::new();
        for (i, &id) in routine.params().iter().enumerate() {
            param_offsets.insert(id, 2 * w + (i as u32) * w);
        }
        let param_bytes = routine.params().len() as u32 * w;

        let mut auto_offsets = HashMap::new();
        let mut cursor = 0u32;
        for &id in routine.autos() {
            let size = container
                .get(id)
                .size()
                .ok_or_else(|| CoreError::InvalidConstruction {
                    reason: format!("{} has no computed size; layout must run before emission", container.get(id).name()),
                })?;
            auto_offsets.insert(id, cursor);
            cursor += size;
        }
        let spill_base = cursor;
        let spill_capacity = routine.peak_temp_count() * w;

        Ok(Self {
            pointer_width: w,
            param_bytes,
            frame_size: spill_base + spill_capacity,
            param_offsets,
            auto_offsets,
            spill_slots: HashMap::new(),
            spill_base,
            spill_capacity,
            next_spill: spill_base,
        })
    }

    pub fn param_bytes(&self) -> u32 {
        self.param_bytes
    }

    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    /// `BP + 2W + i*W`, a plain signed displacement off the base pointer.
    pub fn param_displacement(&self, id: ObjectId) -> Option<i64> {
        self.param_offsets.get(&id).map(|&o| o as i64)
    }

    /// `BP - frame_size + offset`.
    pub fn auto_displacement(&self, id: ObjectId) -> Option<i64> {
        self.auto_offsets.get(&id).map(|&o| o as i64 - self.frame_size as i64)
    }

    pub fn spill_displacement(&self, id: ObjectId) -> Option<i64> {
        self.spill_slots.get(&id).map(|&o| o as i64 - self.frame_size as i64)
    }

    /// Reserves (or reuses) a stack slot in the temp region for `id`, in
    /// the reserved-capacity ring described by the Stash policy of §4.5.4.
    pub fn reserve_spill(&mut self, id: ObjectId) -> i64 {
        if let Some(&existing) = self.spill_slots.get(&id) {
            return existing as i64 - self.frame_size as i64;
        }
        let slot = self.next_spill;
        self.spill_slots.insert(id, slot);
        let mut advanced = slot + self.pointer_width;
        if self.spill_capacity > 0 && advanced >= self.spill_base + self.spill_capacity {
            advanced = self.spill_base;
        }
        self.next_spill = advanced;
        slot as i64 - self.frame_size as i64
    }

    pub fn release_spill(&mut self, id: ObjectId) {
        self.spill_slots.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Object, ObjectKind, Prime, StorageClass, WidthTag};

    #[test]
    fn params_land_at_bp_plus_2w_plus_iw_protected() {
        let mut c = IrContainer::new();
        let mut p1 = Prime::new();
        p1.set_width(WidthTag::Byte4).unwrap();
        let p1id = c.add(Object::new("p1", StorageClass::Param, ObjectKind::Prime(p1)).unwrap()).unwrap();
        let mut p2 = Prime::new();
        p2.set_width(WidthTag::Byte4).unwrap();
        let p2id = c.add(Object::new("p2", StorageClass::Param, ObjectKind::Prime(p2)).unwrap()).unwrap();

        let mut routine = RoutineObj::new();
        routine.push_param(p1id);
        routine.push_param(p2id);

        let frame = Frame::build(&c, &routine, Mode::Protected).unwrap();
        assert_eq!(frame.param_displacement(p1id), Some(8));
        assert_eq!(frame.param_displacement(p2id), Some(12));
        assert_eq!(frame.param_bytes(), 8);
    }

    #[test]
    fn params_land_at_bp_plus_2w_plus_iw_long() {
        let mut c = IrContainer::new();
        let mut p1 = Prime::new();
        p1.set_width(WidthTag::Byte8).unwrap();
        let p1id = c.add(Object::new("p1", StorageClass::Param, ObjectKind::Prime(p1)).unwrap()).unwrap();
        let mut routine = RoutineObj::new();
        routine.push_param(p1id);
        let frame = Frame::build(&c, &routine, Mode::Long).unwrap();
        assert_eq!(frame.param_displacement(p1id), Some(16));
    }
}
