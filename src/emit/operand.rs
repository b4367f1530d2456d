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

//! Operand resolution (§4.5.3): turning an IR object reference into the
//! text an assembler line needs, and the address-component math `ref`
//! uses to build compound (array/struct) effective addresses.

use crate::emit::constants::register_name;
use crate::emit::frame::Frame;
use crate::emit::register::RegisterDescriptor;
use crate::errors::CoreError;
use crate::ir::{IrContainer, ObjectId, ObjectKind, StorageClass};
use crate::target::Mode;

/// Byte width to use when an object's value sits in a register: its own
/// size for a scalar, the machine pointer width for anything addressed
/// rather than loaded (arrays, structs, routines).
pub fn operand_width(container: &IrContainer, mode: Mode, id: ObjectId) -> Result<u32, CoreError> {
    let obj = container.get(id);
    match obj.kind() {
        ObjectKind::Prime(_) => obj.size().ok_or_else(|| CoreError::InvalidConstruction {
            reason: format!("{}: size not computed; layout must run before emission", obj.name()),
        }),
        _ => Ok(mode.pointer_width()),
    }
}

/// The bare address expression for an object's home, with no surrounding
/// brackets: a label for static storage, a `bp`-relative displacement for
/// automatics, parameters, and spilled temps, or a parent-relative
/// expression for a struct member.
pub fn resolve_home(
    container: &IrContainer,
    frame: &Frame,
    mode: Mode,
    id: ObjectId,
) -> Result<String, CoreError> {
    let obj = container.get(id);

    if let Some(member) = obj.member_of() {
        let offset = member.offset.ok_or_else(|| CoreError::InvalidConstruction {
            reason: format!("{}: member offset not resolved; layout must run before emission", obj.name()),
        })?;
        let base = resolve_home(container, frame, mode, member.parent)?;
        return Ok(format!("{base}+{offset}"));
    }

    match obj.storage() {
        StorageClass::Private | StorageClass::Public | StorageClass::Extern => Ok(obj.name().to_string()),
        StorageClass::Param => {
            let d = frame.param_displacement(id).ok_or_else(|| CoreError::NotFound(obj.name().to_string()))?;
            Ok(signed_bp(mode, d))
        }
        StorageClass::Stack => {
            let d = frame.auto_displacement(id).ok_or_else(|| CoreError::NotFound(obj.name().to_string()))?;
            Ok(signed_bp(mode, d))
        }
        StorageClass::Temp => {
            let d = frame
                .spill_displacement(id)
                .ok_or_else(|| CoreError::Internal(format!("{}: temp has no home; it was never spilled", obj.name())))?;
            Ok(signed_bp(mode, d))
        }
        StorageClass::Member => Err(CoreError::Internal(format!(
            "{}: storage class member without member_of metadata",
            obj.name()
        ))),
        StorageClass::Const => Err(CoreError::Internal(format!("{}: constants have no home", obj.name()))),
        StorageClass::Label => Err(CoreError::Internal(format!("{}: labels have no home", obj.name()))),
    }
}

fn signed_bp(mode: Mode, delta: i64) -> String {
    let bp = register_name(crate::emit::register::Register::BasePointer, mode.pointer_width(), mode);
    match delta.cmp(&0) {
        std::cmp::Ordering::Less => format!("{bp}{delta}"),
        std::cmp::Ordering::Equal => bp,
        std::cmp::Ordering::Greater => format!("{bp}+{delta}"),
    }
}

/// The §4.5.3 three-step resolution: a register name, a bracketed memory
/// reference, or (for constants) a bare immediate.
pub fn resolve_source(
    container: &IrContainer,
    frame: &Frame,
    registers: &RegisterDescriptor,
    mode: Mode,
    id: ObjectId,
) -> Result<String, CoreError> {
    let obj = container.get(id);

    if obj.storage() == StorageClass::Const {
        let prime = obj.as_prime().ok_or_else(|| CoreError::BadCast {
            context: obj.name().to_string(),
            expected: "prime",
        })?;
        let value = prime.value().ok_or_else(|| CoreError::InvalidConstruction {
            reason: format!("{}: constant has no value", obj.name()),
        })?;
        return Ok(value.to_string());
    }

    let width = operand_width(container, mode, id)?;

    if let Some(reg) = registers.find_value(id) {
        return Ok(register_name(reg, width, mode));
    }
    if let Some(reg) = registers.find_reference(id) {
        return Ok(format!("[{}]", register_name(reg, mode.pointer_width(), mode)));
    }

    let home = resolve_home(container, frame, mode, id)?;
    Ok(format!("[{home}]"))
}

/// Picks the `LEA` scale factor (1, 2, 4, or 8) for an element size, or
/// `None` when the caller must fall back to an explicit multiply before
/// the address computation.
pub fn lea_scale(element_size: u32) -> Option<u32> {
    matches!(element_size, 1 | 2 | 4 | 8).then_some(element_size)
}

/// Element size of an array object's child shape, used to scale an index
/// before combining it with the base address in `ref`.
pub fn array_element_size(container: &IrContainer, id: ObjectId) -> Result<u32, CoreError> {
    let obj = container.get(id);
    let array = obj.as_array().ok_or_else(|| CoreError::BadCast {
        context: obj.name().to_string(),
        expected: "array",
    })?;
    let total = obj.size().ok_or_else(|| CoreError::InvalidConstruction {
        reason: format!("{}: size not computed; layout must run before emission", obj.name()),
    })?;
    Ok(total / array.count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Object, ObjectKind, Prime, RoutineObj, StorageClass, WidthTag};

    #[test]
    fn static_objects_resolve_to_a_bare_label() {
        let mut c = IrContainer::new();
        let mut p = Prime::new();
        p.set_width(WidthTag::Byte4).unwrap();
        p.set_value(0);
        let id = c.add(Object::new("g", StorageClass::Public, ObjectKind::Prime(p)).unwrap()).unwrap();
        c.get_mut(id).set_size(4);
        let routine = RoutineObj::new();
        let frame = Frame::build(&c, &routine, Mode::Protected).unwrap();
        let registers = RegisterDescriptor::new();
        let text = resolve_source(&c, &frame, &registers, Mode::Protected, id).unwrap();
        assert_eq!(text, "[g]");
    }

    #[test]
    fn constants_resolve_to_a_bare_immediate() {
        let mut c = IrContainer::new();
        let mut p = Prime::new();
        p.set_width(WidthTag::Byte4).unwrap();
        p.set_value(42);
        let id = c.add(Object::new("k", StorageClass::Const, ObjectKind::Prime(p)).unwrap()).unwrap();
        c.get_mut(id).set_size(4);
        let routine = RoutineObj::new();
        let frame = Frame::build(&c, &routine, Mode::Protected).unwrap();
        let registers = RegisterDescriptor::new();
        let text = resolve_source(&c, &frame, &registers, Mode::Protected, id).unwrap();
        assert_eq!(text, "42");
    }

    #[test]
    fn value_in_register_resolves_to_the_register_name() {
        use crate::emit::register::Register;

        let mut c = IrContainer::new();
        let mut p = Prime::new();
        p.set_width(WidthTag::Byte4).unwrap();
        let id = c.add(Object::new("x", StorageClass::Stack, ObjectKind::Prime(p)).unwrap()).unwrap();
        c.get_mut(id).set_size(4);
        let mut routine = RoutineObj::new();
        routine.push_auto(id);
        let frame = Frame::build(&c, &routine, Mode::Protected).unwrap();
        let mut registers = RegisterDescriptor::new();
        registers.set_value(Register::Accumulator, id);
        let text = resolve_source(&c, &frame, &registers, Mode::Protected, id).unwrap();
        assert_eq!(text, "eax");
    }

    #[test]
    fn lea_scale_accepts_only_power_of_two_up_to_eight() {
        assert_eq!(lea_scale(4), Some(4));
        assert_eq!(lea_scale(3), None);
    }
}
