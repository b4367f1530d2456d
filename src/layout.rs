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

//! Compile-time layout: byte sizes for every data object and byte offsets
//! for every struct member, honouring the alignment rules of §4.4. Pure
//! computation — no assembler text is produced here; the emitter renders
//! `struc ... endstruc` directives from the offsets this pass records.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::errors::{CoreError, Warning};
use crate::ir::{ChildShape, IrContainer, ObjectId, ObjectKind, StorageClass, WidthTag};
use crate::target::Mode;

const PASS: &str = "layout";

fn width_size(name: &str, width: WidthTag, mode: Mode) -> Result<u32, CoreError> {
    match (width, mode) {
        (WidthTag::Byte, _) => Ok(1),
        (WidthTag::Byte2, _) => Ok(2),
        (WidthTag::Byte4, _) => Ok(4),
        (WidthTag::Byte8, Mode::Long) => Ok(8),
        (WidthTag::Byte8, Mode::Protected) => Err(CoreError::InvalidWidth {
            name: name.to_string(),
            reason: "byte8 is not representable in protected mode".to_string(),
        }),
        (WidthTag::Word | WidthTag::Ptr | WidthTag::Max, mode) => Ok(mode.pointer_width()),
    }
}

fn align_up(offset: u32, align: u32) -> u32 {
    if align == 0 {
        return offset;
    }
    offset.div_ceil(align) * align
}

/// Read-only scratch used while sizing struct definitions, which may
/// reference each other through nested `StructInst` members. Struct sizes
/// are memoized so a definition referenced by several instances is only
/// laid out once (layout is otherwise idempotent by construction: it is a
/// pure function of the object graph and the mode).
struct LayoutCtx<'a> {
    container: &'a IrContainer,
    mode: Mode,
    struct_cache: RefCell<HashMap<String, (u32, Vec<u32>)>>,
    warnings: RefCell<Vec<Warning>>,
}

impl<'a> LayoutCtx<'a> {
    fn shape_size(&self, label: &str, shape: &ChildShape) -> Result<u32, CoreError> {
        match shape {
            ChildShape::Prime(p) => {
                let width = p.width().ok_or_else(|| CoreError::InvalidConstruction {
                    reason: format!("{label}: prime width was never set"),
                })?;
                width_size(label, width, self.mode)
            }
            ChildShape::Array { count, child, .. } => {
                Ok(self.shape_size(label, child)? * count)
            }
            ChildShape::StructInst { def_name } => Ok(self.struct_size(def_name)?.0),
        }
    }

    fn struct_size(&self, def_name: &str) -> Result<(u32, Vec<u32>), CoreError> {
        if let Some(cached) = self.struct_cache.borrow().get(def_name) {
            return Ok(cached.clone());
        }
        let def_id = self.container.find(def_name)?;
        let def_obj = self.container.get(def_id);
        let def = def_obj.as_struct_def().ok_or_else(|| CoreError::BadCast {
            context: def_name.to_string(),
            expected: "struct_def",
        })?;

        let ptr_w = self.mode.pointer_width();
        let mut offset = 0u32;
        let mut offsets = Vec::with_capacity(def.members().len());
        for (member_name, shape) in def.members() {
            let label = format!("{def_name}.{member_name}");
            let msize = self.shape_size(&label, shape)?;
            let align = if msize > ptr_w { ptr_w } else { msize.max(1) };
            let padded = align_up(offset, align);
            if padded != offset {
                self.warnings.borrow_mut().push(Warning::on(
                    PASS,
                    def_name,
                    format!("{} bytes of padding inserted before member {member_name}", padded - offset),
                ));
            }
            offsets.push(padded);
            offset = padded + msize;
        }
        let total = offset;
        self.struct_cache.borrow_mut().insert(def_name.to_string(), (total, offsets.clone()));
        Ok((total, offsets))
    }

    fn object_size(&self, id: ObjectId) -> Result<u32, CoreError> {
        let obj = self.container.get(id);
        match obj.kind() {
            ObjectKind::Prime(p) => {
                let width = p.width().ok_or_else(|| CoreError::InvalidConstruction {
                    reason: format!("{}: prime width was never set", obj.name()),
                })?;
                width_size(obj.name(), width, self.mode)
            }
            ObjectKind::Array(a) => Ok(self.shape_size(obj.name(), a.child())? * a.count()),
            ObjectKind::StructDef(_) => Ok(self.struct_size(obj.name())?.0),
            ObjectKind::StructInst(si) => Ok(self.struct_size(si.def_name())?.0),
            ObjectKind::Routine(_) => Ok(0),
        }
    }
}

/// Computes sizes for every object and offsets for every struct
/// definition, mutating `container` in place, and returns the padding
/// warnings collected along the way. May be run more than once with
/// identical results (idempotent).
pub fn run(container: &mut IrContainer, mode: Mode) -> Result<Vec<Warning>, CoreError> {
    // Labels carry no size of their own; they are jump/call target markers,
    // not data model objects (see `StorageClass::Label`).
    let ids: Vec<ObjectId> = container
        .iterate()
        .filter(|(_, o)| o.storage() != StorageClass::Label)
        .map(|(id, _)| id)
        .collect();

    let (sizes, struct_offsets, warnings) = {
        let ctx = LayoutCtx {
            container,
            mode,
            struct_cache: RefCell::new(HashMap::new()),
            warnings: RefCell::new(Vec::new()),
        };
        let mut sizes = Vec::with_capacity(ids.len());
        for &id in &ids {
            sizes.push((id, ctx.object_size(id)?));
        }
        let mut struct_offsets = HashMap::new();
        for &id in &ids {
            if let ObjectKind::StructDef(_) = ctx.container.get(id).kind() {
                let name = ctx.container.get(id).name().to_string();
                let (_, offsets) = ctx.struct_size(&name)?;
                struct_offsets.insert(name, offsets);
            }
        }
        (sizes, struct_offsets, ctx.warnings.into_inner())
    };

    for (id, size) in sizes {
        container.get_mut(id).set_size(size);
    }
    for (name, offsets) in struct_offsets {
        let id = container.find(&name)?;
        container.get_mut(id).as_struct_def_mut().unwrap().set_offsets(offsets);
    }

    resolve_member_offsets(container)?;

    Ok(warnings)
}

/// Fills in `offset` on every `member` storage-class object, looking the
/// value up from its parent's resolved struct layout.
fn resolve_member_offsets(container: &mut IrContainer) -> Result<(), CoreError> {
    let member_ids: Vec<ObjectId> = container
        .iterate()
        .filter(|(_, o)| o.member_of().is_some())
        .map(|(id, _)| id)
        .collect();

    for id in member_ids {
        let (parent, member_name) = {
            let obj = container.get(id);
            let m = obj.member_of().unwrap();
            (m.parent, m.member_name.clone())
        };
        let parent_obj = container.get(parent);
        let def_name = match parent_obj.kind() {
            ObjectKind::StructInst(si) => si.def_name().to_string(),
            _ => {
                return Err(CoreError::BadCast {
                    context: container.get(id).name().to_string(),
                    expected: "struct_inst parent",
                });
            }
        };
        let def_id = container.find(&def_name)?;
        let offset = container
            .get(def_id)
            .as_struct_def()
            .and_then(|d| d.offset_of(&member_name))
            .ok_or_else(|| CoreError::NotFound(format!("{def_name}.{member_name}")))?;
        container.get_mut(id).member_of_mut().unwrap().offset = Some(offset);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ArrayObj, ChildShape, Object, ObjectKind, Prime, StorageClass, StructDefObj};

    #[test]
    fn prime_sizes_follow_the_width_table() {
        let mut c = IrContainer::new();
        let mut p = Prime::new();
        p.set_width(WidthTag::Byte4).unwrap();
        let id = c.add(Object::new("a", StorageClass::Public, ObjectKind::Prime(p)).unwrap()).unwrap();
        run(&mut c, Mode::Protected).unwrap();
        assert_eq!(c.get(id).size(), Some(4));
    }

    #[test]
    fn byte8_in_protected_mode_is_a_hard_error() {
        let mut c = IrContainer::new();
        let mut p = Prime::new();
        p.set_width(WidthTag::Byte8).unwrap();
        c.add(Object::new("a", StorageClass::Public, ObjectKind::Prime(p)).unwrap()).unwrap();
        let err = run(&mut c, Mode::Protected).unwrap_err();
        assert!(matches!(err, CoreError::InvalidWidth { .. }));
    }

    #[test]
    fn struct_offsets_follow_natural_alignment_with_padding_warning() {
        let mut c = IrContainer::new();
        let mut def = StructDefObj::new();
        let mut pa = Prime::new();
        pa.set_width(WidthTag::Byte).unwrap();
        def.push_member("a", ChildShape::Prime(pa)).unwrap();
        let mut pb = Prime::new();
        pb.set_width(WidthTag::Byte4).unwrap();
        def.push_member("b", ChildShape::Prime(pb)).unwrap();
        let mut pc = Prime::new();
        pc.set_width(WidthTag::Byte).unwrap();
        def.push_member("c", ChildShape::Prime(pc)).unwrap();
        let id = c.add(Object::new("S", StorageClass::Public, ObjectKind::StructDef(def)).unwrap()).unwrap();

        let warnings = run(&mut c, Mode::Protected).unwrap();

        let s = c.get(id).as_struct_def().unwrap();
        assert_eq!(s.offsets(), &[0, 4, 8]);
        assert_eq!(c.get(id).size(), Some(9));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn array_size_is_child_size_times_count() {
        let mut c = IrContainer::new();
        let mut child = Prime::new();
        child.set_width(WidthTag::Byte4).unwrap();
        let arr = ArrayObj::new(4, ChildShape::Prime(child), None).unwrap();
        let id = c.add(Object::new("arr", StorageClass::Public, ObjectKind::Array(arr)).unwrap()).unwrap();
        run(&mut c, Mode::Protected).unwrap();
        assert_eq!(c.get(id).size(), Some(16));
    }

    #[test]
    fn layout_is_idempotent() {
        let mut c = IrContainer::new();
        let mut def = StructDefObj::new();
        let mut pa = Prime::new();
        pa.set_width(WidthTag::Byte).unwrap();
        def.push_member("a", ChildShape::Prime(pa)).unwrap();
        let mut pb = Prime::new();
        pb.set_width(WidthTag::Byte4).unwrap();
        def.push_member("b", ChildShape::Prime(pb)).unwrap();
        let id = c.add(Object::new("S", StorageClass::Public, ObjectKind::StructDef(def)).unwrap()).unwrap();

        run(&mut c, Mode::Protected).unwrap();
        let first = c.get(id).as_struct_def().unwrap().offsets().to_vec();
        run(&mut c, Mode::Protected).unwrap();
        let second = c.get(id).as_struct_def().unwrap().offsets().to_vec();
        assert_eq!(first, second);
    }
}
