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

//! The IR data model: named objects, three-address instructions, basic
//! blocks, and the container that owns all of it.

pub mod container;
pub mod instruction;
pub mod object;

pub use container::IrContainer;
pub use instruction::{Block, Instruction, Opcode, OpcodeClass, OperandSlot};
pub use object::{
    ArrayObj, ChildShape, MemberRef, Object, ObjectId, ObjectKind, Prime, RoutineObj,
    StorageClass, StructDefObj, StructInstObj, WidthTag,
};
