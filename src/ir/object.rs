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

use crate::errors::CoreError;
use crate::ir::instruction::Block;

/// A non-owning handle into an [`crate::ir::container::IrContainer`] arena.
/// Stable across insertions; invalidated only by removal of the object it
/// names (liveness is the sole caller that ever removes one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Builds a synthetic id outside a container; only for unit tests that
    /// exercise one component (e.g. the register descriptor) in isolation.
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Private,
    Public,
    Extern,
    Stack,
    Param,
    Member,
    Temp,
    Const,
    /// A jump/call target or block leader marker. Not a data model concept
    /// from §3 — an implementation detail of representing `lbl`/`jmp`/
    /// `jz`/`loop`/`call` targets as ordinary object handles so
    /// instructions stay uniformly three `ObjectId`-shaped slots. Carries
    /// no size and never appears in `.data` or a `global`/`extern`
    /// directive.
    Label,
}

impl StorageClass {
    /// `private`/`public`/`extern` objects are laid out in `.data` and
    /// addressed by a bare label.
    pub fn is_static(self) -> bool {
        matches!(self, StorageClass::Private | StorageClass::Public | StorageClass::Extern)
    }

    pub fn is_routine_class(self) -> bool {
        matches!(self, StorageClass::Private | StorageClass::Public)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthTag {
    Byte,
    Byte2,
    Byte4,
    Byte8,
    Word,
    Ptr,
    Max,
}

/// A scalar. Width and signedness are each settable exactly once; a second
/// attempt is a [`CoreError::AlreadySet`].
#[derive(Debug, Clone, Default)]
pub struct Prime {
    width: Option<WidthTag>,
    signed: Option<bool>,
    value: Option<i64>,
}

impl Prime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_width(&mut self, width: WidthTag) -> Result<(), CoreError> {
        if self.width.is_some() {
            return Err(CoreError::AlreadySet { field: "prime width" });
        }
        self.width = Some(width);
        Ok(())
    }

    pub fn set_signed(&mut self, signed: bool) -> Result<(), CoreError> {
        if self.signed.is_some() {
            return Err(CoreError::AlreadySet { field: "prime signedness" });
        }
        self.signed = Some(signed);
        Ok(())
    }

    pub fn set_value(&mut self, value: i64) {
        self.value = Some(value);
    }

    pub fn width(&self) -> Option<WidthTag> {
        self.width
    }

    pub fn is_signed(&self) -> bool {
        self.signed.unwrap_or(false)
    }

    pub fn value(&self) -> Option<i64> {
        self.value
    }
}

/// The unnamed shape of an array element or struct member: anything a
/// [`Prime`] can be, or a nested array, or a reference to a struct
/// definition by name (never a routine).
#[derive(Debug, Clone)]
pub enum ChildShape {
    Prime(Prime),
    Array { count: u32, child: Box<ChildShape>, init: Option<Vec<u8>> },
    StructInst { def_name: String },
}

/// A homogeneous sequence. `child` and `count` are each set exactly once,
/// at construction time by the front end.
#[derive(Debug, Clone)]
pub struct ArrayObj {
    count: u32,
    child: Box<ChildShape>,
    init: Option<Vec<u8>>,
}

impl ArrayObj {
    pub fn new(count: u32, child: ChildShape, init: Option<Vec<u8>>) -> Result<Self, CoreError> {
        if count == 0 {
            return Err(CoreError::InvalidConstruction {
                reason: "array element count must be positive".into(),
            });
        }
        Ok(Self { count, child: Box::new(child), init })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn child(&self) -> &ChildShape {
        &self.child
    }

    pub fn init(&self) -> Option<&[u8]> {
        self.init.as_deref()
    }
}

/// An ordered, name-indexed list of struct members. Offsets start empty and
/// are filled in by the layout pass exactly once.
#[derive(Debug, Clone, Default)]
pub struct StructDefObj {
    members: Vec<(String, ChildShape)>,
    offsets: Vec<u32>,
}

impl StructDefObj {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_member(&mut self, name: impl Into<String>, shape: ChildShape) -> Result<(), CoreError> {
        let name = name.into();
        if self.members.iter().any(|(n, _)| *n == name) {
            return Err(CoreError::DuplicateName(name));
        }
        self.members.push((name, shape));
        Ok(())
    }

    pub fn members(&self) -> &[(String, ChildShape)] {
        &self.members
    }

    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|(n, _)| n == name)
    }

    pub fn set_offsets(&mut self, offsets: Vec<u32>) {
        debug_assert_eq!(offsets.len(), self.members.len());
        self.offsets = offsets;
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn offset_of(&self, name: &str) -> Option<u32> {
        self.member_index(name).and_then(|i| self.offsets.get(i).copied())
    }
}

/// A named instance of a struct definition; its size and member offsets are
/// those of the [`StructDefObj`] it points to.
#[derive(Debug, Clone)]
pub struct StructInstObj {
    def_name: String,
}

impl StructInstObj {
    pub fn new(def_name: impl Into<String>) -> Self {
        Self { def_name: def_name.into() }
    }

    pub fn def_name(&self) -> &str {
        &self.def_name
    }
}

/// A function body. Parameters and automatics reference sibling objects in
/// the same container (storage class `param`/`stack`); `peak_temp_count` is
/// set once by liveness and consumed by the layout pass when sizing the
/// spill region of the frame.
#[derive(Debug, Clone, Default)]
pub struct RoutineObj {
    raw_instructions: Vec<crate::ir::instruction::Instruction>,
    blocks: Vec<Block>,
    params: Vec<ObjectId>,
    autos: Vec<ObjectId>,
    peak_temp_count: Option<u32>,
}

impl RoutineObj {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_instruction(&mut self, instr: crate::ir::instruction::Instruction) {
        self.raw_instructions.push(instr);
    }

    pub fn raw_instructions(&self) -> &[crate::ir::instruction::Instruction] {
        &self.raw_instructions
    }

    pub fn take_raw_instructions(&mut self) -> Vec<crate::ir::instruction::Instruction> {
        std::mem::take(&mut self.raw_instructions)
    }

    pub fn set_blocks(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    pub fn push_param(&mut self, id: ObjectId) {
        self.params.push(id);
    }

    pub fn push_auto(&mut self, id: ObjectId) {
        self.autos.push(id);
    }

    pub fn params(&self) -> &[ObjectId] {
        &self.params
    }

    pub fn autos(&self) -> &[ObjectId] {
        &self.autos
    }

    pub fn set_peak_temp_count(&mut self, count: u32) {
        self.peak_temp_count = Some(count);
    }

    pub fn peak_temp_count(&self) -> u32 {
        self.peak_temp_count.unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Prime(Prime),
    Array(ArrayObj),
    StructDef(StructDefObj),
    StructInst(StructInstObj),
    Routine(RoutineObj),
}

/// Optional addressing metadata carried by a `member` storage-class object:
/// the struct instance it was projected from, and the byte offset the
/// layout pass resolves for it.
#[derive(Debug, Clone)]
pub struct MemberRef {
    pub parent: ObjectId,
    pub member_name: String,
    pub offset: Option<u32>,
}

/// The base of everything that has a name. `name` is set exactly once, at
/// construction; `size` starts unset and is filled in by the layout pass.
#[derive(Debug, Clone)]
pub struct Object {
    name: String,
    storage: StorageClass,
    size: Option<u32>,
    kind: ObjectKind,
    member_of: Option<MemberRef>,
}

impl Object {
    pub fn new(name: impl Into<String>, storage: StorageClass, kind: ObjectKind) -> Result<Self, CoreError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::Unnamed);
        }
        if let ObjectKind::Routine(_) = &kind {
            if !storage.is_routine_class() {
                return Err(CoreError::InvalidStorageClass {
                    name,
                    reason: "routines must be private or public".into(),
                });
            }
        }
        Ok(Self { name, storage, size: None, kind, member_of: None })
    }

    pub fn with_member_of(mut self, member_of: MemberRef) -> Self {
        self.member_of = Some(member_of);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> StorageClass {
        self.storage
    }

    pub fn size(&self) -> Option<u32> {
        self.size
    }

    pub fn set_size(&mut self, size: u32) {
        self.size = Some(size);
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ObjectKind {
        &mut self.kind
    }

    pub fn member_of(&self) -> Option<&MemberRef> {
        self.member_of.as_ref()
    }

    pub fn member_of_mut(&mut self) -> Option<&mut MemberRef> {
        self.member_of.as_mut()
    }

    pub fn as_prime(&self) -> Option<&Prime> {
        match &self.kind {
            ObjectKind::Prime(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayObj> {
        match &self.kind {
            ObjectKind::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_struct_def(&self) -> Option<&StructDefObj> {
        match &self.kind {
            ObjectKind::StructDef(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct_def_mut(&mut self) -> Option<&mut StructDefObj> {
        match &mut self.kind {
            ObjectKind::StructDef(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct_inst(&self) -> Option<&StructInstObj> {
        match &self.kind {
            ObjectKind::StructInst(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_routine(&self) -> Option<&RoutineObj> {
        match &self.kind {
            ObjectKind::Routine(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_routine_mut(&mut self) -> Option<&mut RoutineObj> {
        match &mut self.kind {
            ObjectKind::Routine(r) => Some(r),
            _ => None,
        }
    }
}
