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

//! Static data emission (§4.5.6) and struct layout directives. Produces
//! the `.data` section body and the `struc ... endstruc` blocks that
//! precede it in the output (§4.5.7).

use crate::errors::CoreError;
use crate::ir::{ChildShape, IrContainer, ObjectKind, StorageClass};

fn width_directive(size: u32) -> &'static str {
    match size {
        1 => "db",
        2 => "dw",
        4 => "dd",
        _ => "dq",
    }
}

fn hex_literal(value: i64) -> String {
    if value >= 0 {
        format!("0x{value:x}")
    } else {
        value.to_string()
    }
}

/// `global`/`extern` visibility directives, one per static or routine
/// object, in container (insertion) order.
pub fn render_visibility(container: &IrContainer) -> Vec<String> {
    container
        .iterate()
        .filter_map(|(_, obj)| match obj.storage() {
            StorageClass::Public => Some(format!("global {}", obj.name())),
            StorageClass::Extern => Some(format!("extern {}", obj.name())),
            _ => None,
        })
        .collect()
}

/// `struc NAME ... endstruc` for every struct definition, each followed by
/// the `%if (N != NAME_size) %error ... %endif` assertion against the
/// size the layout pass actually computed.
pub fn render_struct_layouts(container: &IrContainer, mode: crate::target::Mode) -> Result<Vec<String>, CoreError> {
    let mut lines = Vec::new();
    for (_, obj) in container.iterate() {
        let ObjectKind::StructDef(def) = obj.kind() else { continue };
        let total = obj
            .size()
            .ok_or_else(|| CoreError::InvalidConstruction { reason: format!("{}: size not computed", obj.name()) })?;
        lines.push(format!("struc {}", obj.name()));
        for (name, shape) in def.members() {
            let size = shape_byte_size(container, mode, shape)?;
            lines.push(format!("    .{name}: resb {size}"));
        }
        lines.push("endstruc".to_string());
        lines.push(format!(
            "%if ({total} != {}_size) %error \"layout mismatch in {}\" %endif",
            obj.name(),
            obj.name()
        ));
    }
    Ok(lines)
}

fn shape_byte_size(container: &IrContainer, mode: crate::target::Mode, shape: &ChildShape) -> Result<u32, CoreError> {
    match shape {
        ChildShape::Prime(p) => {
            let width = p.width().ok_or_else(|| CoreError::InvalidConstruction { reason: "prime width was never set".to_string() })?;
            Ok(match width {
                crate::ir::WidthTag::Byte => 1,
                crate::ir::WidthTag::Byte2 => 2,
                crate::ir::WidthTag::Byte4 => 4,
                crate::ir::WidthTag::Byte8 => 8,
                crate::ir::WidthTag::Word | crate::ir::WidthTag::Ptr | crate::ir::WidthTag::Max => mode.pointer_width(),
            })
        }
        ChildShape::Array { count, child, .. } => Ok(shape_byte_size(container, mode, child)? * count),
        ChildShape::StructInst { def_name } => {
            let id = container.find(def_name)?;
            container
                .get(id)
                .size()
                .ok_or_else(|| CoreError::InvalidConstruction { reason: format!("{def_name}: size not computed") })
        }
    }
}

/// The body of `section .data`: one declaration per `private`/`public`
/// object (routines and `extern`s carry no storage of their own).
pub fn render_data_section(container: &IrContainer) -> Result<Vec<String>, CoreError> {
    let mut lines = Vec::new();
    for (_, obj) in container.iterate() {
        if !matches!(obj.storage(), StorageClass::Private | StorageClass::Public) {
            continue;
        }
        match obj.kind() {
            ObjectKind::Prime(p) => {
                let size = obj.size().ok_or_else(|| CoreError::InvalidConstruction { reason: format!("{}: size not computed", obj.name()) })?;
                let value = p.value().unwrap_or(0);
                lines.push(format!("{}: {} {}", obj.name(), width_directive(size), hex_literal(value)));
            }
            ObjectKind::Array(arr) => {
                let total = obj.size().ok_or_else(|| CoreError::InvalidConstruction { reason: format!("{}: size not computed", obj.name()) })?;
                match arr.init() {
                    Some(bytes) => {
                        let items: Vec<String> = bytes
                            .iter()
                            .map(|&b| {
                                if b.is_ascii_graphic() || b == b' ' {
                                    format!("'{}'", b as char)
                                } else {
                                    format!("0x{b:02x}")
                                }
                            })
                            .collect();
                        lines.push(format!("{}: db {}", obj.name(), items.join(", ")));
                    }
                    None => lines.push(format!("{}: resb {total}", obj.name())),
                }
            }
            ObjectKind::StructInst(_) => {
                let total = obj.size().ok_or_else(|| CoreError::InvalidConstruction { reason: format!("{}: size not computed", obj.name()) })?;
                lines.push(format!("{}: resb {total}", obj.name()));
            }
            ObjectKind::StructDef(_) | ObjectKind::Routine(_) => {}
        }
    }
    Ok(lines)
}
