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

//! End-to-end tests driving the full block-forming -> liveness -> layout
//! -> emission pipeline, either through the textual front end or by
//! building an `IrContainer` directly for constructs (arrays, struct
//! instances) the front end doesn't have surface syntax for.

use mplgen::errors::CoreError;
use mplgen::ir::{
    ArrayObj, ChildShape, Instruction, IrContainer, Object, ObjectKind, Opcode, Prime, RoutineObj,
    StorageClass, StructInstObj, WidthTag,
};
use mplgen::target::Mode;
use mplgen::text_ir::lower::lower;

fn prime(width: WidthTag) -> Prime {
    let mut p = Prime::new();
    p.set_width(width).unwrap();
    p
}

#[test]
fn trivial_assignment_loads_and_stores_through_the_accumulator() {
    let source = r#"
        data public x: byte4 = 0
        data public y: byte4 = 0

        routine public main() {
            ass x, y
            rtrn
        }
    "#;
    let mut container = lower(source).unwrap();
    let result = mplgen::generate(&mut container, Mode::Protected).unwrap();
    assert!(result.warnings.is_empty());

    let body: Vec<&str> = result.assembly.lines().map(str::trim).collect();
    let start = body.iter().position(|l| *l == "main:").unwrap();
    assert_eq!(
        &body[start..start + 6],
        ["main:", "enter 0, 0", "mov eax, [y]", "mov [x], eax", "leave", "ret 0"]
    );
}

#[test]
fn dead_temp_elimination_prunes_the_unused_temp_end_to_end() {
    let source = r#"
        data public a: byte4 = 0
        data public b: byte4 = 0
        data public c: byte4 = 0
        data public d: byte4 = 0
        data public rdst: byte4 = 0

        routine public main() {
            temp t1: byte4
            temp t2: byte4
            mul t1, a, b
            mul t2, c, d
            ass rdst, t1
            rtrn
        }
    "#;
    let mut container = lower(source).unwrap();
    let result = mplgen::generate(&mut container, Mode::Protected).unwrap();

    assert!(container.find_opt("t2").is_none(), "t2 is never read and should have been pruned");
    assert!(container.find_opt("t1").is_some(), "t1 feeds the final assignment and must survive");

    assert_eq!(result.traces.len(), 1);
    assert_eq!(result.traces[0].name, "main");
    assert_eq!(result.traces[0].peak_temp_count, 1, "t1 and t2 are never concurrently live");

    let routine_id = container.find("main").unwrap();
    let routine = container.get(routine_id).as_routine().unwrap();
    let opcodes: Vec<Opcode> = routine.blocks().iter().flat_map(|b| b.instructions.iter().map(|i| i.opcode)).collect();
    assert_eq!(opcodes, vec![Opcode::Mul, Opcode::Ass, Opcode::Rtrn], "the dead mul must not survive to emission");
}

#[test]
fn struct_layout_renders_struc_blocks_and_assigns_natural_offsets() {
    let source = r#"
        struct Point { x: byte4, y: byte4 }
        struct Packet { flag: byte, value: byte4 }
    "#;
    let mut container = lower(source).unwrap();
    container
        .add(Object::new("origin", StorageClass::Public, ObjectKind::StructInst(StructInstObj::new("Point"))).unwrap())
        .unwrap();
    container
        .add(Object::new("pkt", StorageClass::Public, ObjectKind::StructInst(StructInstObj::new("Packet"))).unwrap())
        .unwrap();

    let result = mplgen::generate(&mut container, Mode::Protected).unwrap();

    assert_eq!(result.warnings.len(), 1, "Packet needs 3 bytes of padding before `value`");
    assert!(result.warnings[0].message.contains("3 bytes of padding"));
    assert!(result.warnings[0].message.contains("value"));

    let point_id = container.find("Point").unwrap();
    let point = container.get(point_id).as_struct_def().unwrap();
    assert_eq!(point.offsets(), &[0, 4]);
    assert_eq!(container.get(point_id).size(), Some(8));

    let packet_id = container.find("Packet").unwrap();
    let packet = container.get(packet_id).as_struct_def().unwrap();
    assert_eq!(packet.offsets(), &[0, 4]);
    assert_eq!(container.get(packet_id).size(), Some(8));

    assert!(result.assembly.contains("struc Point"));
    assert!(result.assembly.contains(".x: resb 4"));
    assert!(result.assembly.contains(".y: resb 4"));
    assert!(result.assembly.contains("%if (8 != Point_size) %error \"layout mismatch in Point\" %endif"));
    assert!(result.assembly.contains("struc Packet"));
    assert!(result.assembly.contains(".flag: resb 1"));
    assert!(result.assembly.contains(".value: resb 4"));
    assert!(result.assembly.contains("global origin"));
    assert!(result.assembly.contains("global pkt"));
    assert!(result.assembly.contains("origin: resb 8"));
    assert!(result.assembly.contains("pkt: resb 8"));
}

/// Builds a routine computing `out = arr[idx]` without going through the
/// textual front end, which has no syntax for declaring an array.
#[test]
fn array_indexing_scales_the_index_by_element_size() {
    let mut container = IrContainer::new();
    let out = container.add(Object::new("out", StorageClass::Public, ObjectKind::Prime(prime(WidthTag::Byte4))).unwrap()).unwrap();
    let arr = container
        .add(
            Object::new(
                "arr",
                StorageClass::Stack,
                ObjectKind::Array(ArrayObj::new(5, ChildShape::Prime(prime(WidthTag::Byte4)), None).unwrap()),
            )
            .unwrap(),
        )
        .unwrap();
    let idx = container.add(Object::new("idx", StorageClass::Stack, ObjectKind::Prime(prime(WidthTag::Byte4))).unwrap()).unwrap();
    let tmp = container.add(Object::new("tmp", StorageClass::Temp, ObjectKind::Prime(prime(WidthTag::Ptr))).unwrap()).unwrap();

    let mut routine = RoutineObj::new();
    routine.push_auto(arr);
    routine.push_auto(idx);
    routine.push_instruction(Instruction::new(Opcode::Ref, Some(tmp), Some(arr), Some(idx)));
    routine.push_instruction(Instruction::new(Opcode::Dref, Some(out), Some(tmp), None));
    routine.push_instruction(Instruction::new(Opcode::Rtrn, None, Some(out), None));
    let routine_id = container.add(Object::new("main", StorageClass::Public, ObjectKind::Routine(routine)).unwrap()).unwrap();

    let result = mplgen::generate(&mut container, Mode::Protected).unwrap();
    let _ = routine_id;

    // arr: 20 bytes at ebp-28, idx: 4 bytes at ebp-8, one spilled temp slot
    // reserved above them (frame_size = 20 + 4 + 4 = 28).
    assert!(result.assembly.contains("enter 28, 0"));
    assert!(result.assembly.contains("mov ecx, [ebp-8]"), "the index is not a compile-time constant, so it loads into ecx");
    assert!(result.assembly.contains("lea esi, [ebp-28+ecx*4]"), "element size 4 is a valid LEA scale");
    assert!(result.assembly.contains("mov eax, [eax]"), "dref reads through the pointer `ref` just computed");
}

#[test]
fn parameter_passing_pushes_arguments_and_indexes_them_at_bp_plus_2w() {
    let source = r#"
        data public result: byte4 = 0

        routine public plus(a: byte4, b: byte4) -> byte4 {
            temp sum: byte4
            add sum, a, b
            rtrn sum
        }

        routine public main() {
            parm 2
            parm 3
            call result, plus
            rtrn
        }
    "#;
    let mut container = lower(source).unwrap();
    let result = mplgen::generate(&mut container, Mode::Protected).unwrap();

    let lines: Vec<&str> = result.assembly.lines().map(str::trim).collect();
    let plus_start = lines.iter().position(|l| *l == "plus:").unwrap();
    assert_eq!(
        &lines[plus_start..plus_start + 5],
        ["plus:", "enter 4, 0", "mov eax, [ebp+8]", "add eax, [ebp+12]", "leave"]
    );
    assert_eq!(lines[plus_start + 5], "ret 8", "the callee unwinds its own 2 pushed byte4 parameters");

    let main_start = lines.iter().position(|l| *l == "main:").unwrap();
    assert_eq!(
        &lines[main_start..main_start + 6],
        ["main:", "enter 0, 0", "push 2", "push 3", "call plus", "mov [result], eax"]
    );
    // The result is stored exactly once: finish_result's store at the call
    // site must clear the accumulator so the end-of-block flush doesn't
    // repeat it.
    assert_eq!(result.assembly.matches("mov [result], eax").count(), 1);
}

#[test]
fn register_state_does_not_cross_a_block_boundary() {
    let source = r#"
        data public a: byte4 = 0
        data public b: byte4 = 0

        routine public main() {
            ass a, b
            jmp next
        next:
            ass b, a
            rtrn
        }
    "#;
    let mut container = lower(source).unwrap();
    let result = mplgen::generate(&mut container, Mode::Protected).unwrap();

    let lines: Vec<&str> = result.assembly.lines().map(str::trim).collect();
    let start = lines.iter().position(|l| *l == "main:").unwrap();
    assert_eq!(
        &lines[start..start + 4],
        ["main:", "enter 0, 0", "mov eax, [b]", "mov [a], eax"]
    );
    assert_eq!(lines[start + 4], "jmp next");
    assert_eq!(lines[start + 5], "next:");
    // The second block reloads `a` from memory; it never assumes the
    // accumulator still holds it from before the jump.
    assert_eq!(
        &lines[start + 6..start + 10],
        ["mov eax, [a]", "mov [b], eax", "leave", "ret 0"]
    );
}

#[test]
fn empty_container_produces_a_header_and_trailer_only_file() {
    let mut container = IrContainer::new();
    let result = mplgen::generate(&mut container, Mode::Protected).unwrap();
    assert!(result.warnings.is_empty());
    assert!(result.traces.is_empty());
    assert!(result.assembly.contains("Generated by mplgen"));
    assert!(result.assembly.contains("End of MPL generated file"));
    assert!(!result.assembly.contains("section .code\n;"), "nothing should be emitted between the sections");
}

#[test]
fn a_routine_with_only_nop_compiles_without_a_terminator() {
    let source = "routine public main() { nop }";
    let mut container = lower(source).unwrap();
    let result = mplgen::generate(&mut container, Mode::Protected).unwrap();
    assert!(result.assembly.contains("main:"));
    assert!(result.assembly.contains("enter 0, 0"));
}

#[test]
fn byte8_in_protected_mode_is_a_hard_error() {
    let source = "data public huge: byte8 = 0";
    let mut container = lower(source).unwrap();
    let err = mplgen::generate(&mut container, Mode::Protected).unwrap_err();
    let full = format!("{err:?}");
    assert!(full.contains("Failed during layout"));
    assert!(full.contains("byte8"));
    assert!(full.contains("protected mode"));
}

#[test]
fn textual_front_end_round_trips_every_construct_it_can_express() {
    let source = r#"
        data private counter: word = 7
        struct Pair { first: byte4, second: byte4 }

        routine public adder(x: byte4, y: byte4) -> byte4 {
            auto scratch: byte4
            temp t: byte4
            add t, x, y
            ass scratch, t
            rtrn scratch
        }
    "#;
    let container = lower(source).unwrap();

    let counter_id = container.find("counter").unwrap();
    assert_eq!(container.get(counter_id).storage(), StorageClass::Private);
    assert_eq!(container.get(counter_id).as_prime().unwrap().value(), Some(7));

    let pair_id = container.find("Pair").unwrap();
    let pair = container.get(pair_id).as_struct_def().unwrap();
    assert_eq!(pair.members().len(), 2);

    let routine_id = container.find("adder").unwrap();
    let routine = container.get(routine_id).as_routine().unwrap();
    assert_eq!(routine.params().len(), 2);
    assert_eq!(routine.autos().len(), 1);
    assert_eq!(routine.raw_instructions().len(), 3);

    assert!(container.find_opt("scratch").is_some());
    assert!(container.find_opt("t").is_some());
}

#[test]
fn malformed_textual_ir_surfaces_a_parse_error_not_a_panic() {
    let err = lower("routine public main( {\n    nop\n").unwrap_err();
    assert!(matches!(err, CoreError::ParseError(_)));
}

#[test]
fn unknown_identifier_in_textual_ir_is_a_not_found_error_not_a_panic() {
    let err = lower("routine public main() {\n    ass missing, alsomissing\n}\n").unwrap_err();
    assert_eq!(err, CoreError::NotFound("missing".to_string()));
}
