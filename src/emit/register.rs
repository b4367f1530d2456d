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

//! The register descriptor (§4.5.1): per-register bookkeeping of which IR
//! object currently occupies it and whether it holds a value or an
//! address. Deliberately simple — the accumulator is always the mandatory
//! result register (see the design notes on register descriptor policy);
//! this file never tries to be a linear-scan allocator.

use crate::ir::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Accumulator,
    Base,
    Counter,
    Data,
    SourceIndex,
    DestIndex,
    BasePointer,
    StackPointer,
    Ext(u8), // r8..r15, long mode only
}

impl Register {
    /// General-purpose registers the allocator is allowed to hand out as
    /// scratch, in victim order (accumulator last — see `Stash`'s "no free
    /// register" policy).
    pub fn scratch_pool(long_mode: bool) -> Vec<Register> {
        let mut pool = vec![
            Register::Data,
            Register::Counter,
            Register::Base,
            Register::SourceIndex,
            Register::DestIndex,
        ];
        if long_mode {
            pool.extend((8u8..=15).map(Register::Ext));
        }
        pool.push(Register::Accumulator);
        pool
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Value,
    Reference,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    object: ObjectId,
    occupancy: Occupancy,
}

/// Tracks register contents for the routine currently being emitted.
/// Cleared at the start of every routine (§4.5.1); every register holding
/// a memory-backed object must be flushed before a block falls through to
/// the next (enforced by the emitter driver, not this type).
#[derive(Debug, Default)]
pub struct RegisterDescriptor {
    slots: Vec<(Register, Slot)>,
}

impl RegisterDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_all(&mut self) {
        self.slots.clear();
    }

    pub fn clear_one(&mut self, reg: Register) {
        self.slots.retain(|(r, _)| *r != reg);
    }

    pub fn set_value(&mut self, reg: Register, object: ObjectId) {
        self.clear_one(reg);
        self.slots.push((reg, Slot { object, occupancy: Occupancy::Value }));
    }

    pub fn set_reference(&mut self, reg: Register, object: ObjectId) {
        self.clear_one(reg);
        self.slots.push((reg, Slot { object, occupancy: Occupancy::Reference }));
    }

    pub fn find_value(&self, object: ObjectId) -> Option<Register> {
        self.slots
            .iter()
            .find(|(_, s)| s.object == object && s.occupancy == Occupancy::Value)
            .map(|(r, _)| *r)
    }

    pub fn find_reference(&self, object: ObjectId) -> Option<Register> {
        self.slots
            .iter()
            .find(|(_, s)| s.object == object && s.occupancy == Occupancy::Reference)
            .map(|(r, _)| *r)
    }

    pub fn is_empty_reg(&self, reg: Register) -> bool {
        !self.slots.iter().any(|(r, _)| *r == reg)
    }

    pub fn occupant(&self, reg: Register) -> Option<(ObjectId, Occupancy)> {
        self.slots.iter().find(|(r, _)| *r == reg).map(|(_, s)| (s.object, s.occupancy))
    }

    /// Swaps the logical contents of two registers (used by `Load` when
    /// the value it needs is already sitting in a different register).
    pub fn exchange(&mut self, a: Register, b: Register) {
        let a_slot = self.slots.iter().position(|(r, _)| *r == a).map(|i| self.slots[i].1);
        let b_slot = self.slots.iter().position(|(r, _)| *r == b).map(|i| self.slots[i].1);
        self.clear_one(a);
        self.clear_one(b);
        if let Some(s) = b_slot {
            self.slots.push((a, s));
        }
        if let Some(s) = a_slot {
            self.slots.push((b, s));
        }
    }

    /// Every register that currently holds a memory-backed object (i.e.
    /// anything except a bare reference that was only ever a scratch
    /// address) — used at block boundaries to decide what must be flushed.
    pub fn occupied_registers(&self) -> impl Iterator<Item = Register> + '_ {
        self.slots.iter().map(|(r, _)| *r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u32) -> ObjectId {
        crate::ir::object::ObjectId::from_raw(n)
    }

    #[test]
    fn set_and_find_value() {
        let mut d = RegisterDescriptor::new();
        d.set_value(Register::Accumulator, oid(1));
        assert_eq!(d.find_value(oid(1)), Some(Register::Accumulator));
        assert_eq!(d.find_reference(oid(1)), None);
    }

    #[test]
    fn exchange_swaps_contents() {
        let mut d = RegisterDescriptor::new();
        d.set_value(Register::Accumulator, oid(1));
        d.set_value(Register::Base, oid(2));
        d.exchange(Register::Accumulator, Register::Base);
        assert_eq!(d.find_value(oid(1)), Some(Register::Base));
        assert_eq!(d.find_value(oid(2)), Some(Register::Accumulator));
    }

    #[test]
    fn clear_all_empties_every_register() {
        let mut d = RegisterDescriptor::new();
        d.set_value(Register::Accumulator, oid(1));
        d.clear_all();
        assert!(d.is_empty_reg(Register::Accumulator));
    }
}
