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

//! Walks the parse tree of §3.1's textual notation once, populating an
//! [`IrContainer`]. Every object must be declared before use — the one
//! exception is a label target referenced by a `jmp`/`jz`/`loop` earlier
//! in the same routine than the `lbl` that defines it, which a small
//! pre-scan registers up front so forward branches are possible without a
//! second resolution pass over the rest of the program.

use pest::iterators::Pair;

use crate::errors::CoreError;
use crate::ir::{Instruction, IrContainer, Object, ObjectKind, Opcode, Prime, RoutineObj, StorageClass, WidthTag};
use crate::text_ir::Rule;

fn storage_of(pair: Pair<Rule>) -> StorageClass {
    match pair.as_str() {
        "public" => StorageClass::Public,
        "extern" => StorageClass::Extern,
        _ => StorageClass::Private,
    }
}

fn width_of(pair: Pair<Rule>) -> WidthTag {
    match pair.as_str() {
        "byte8" => WidthTag::Byte8,
        "byte4" => WidthTag::Byte4,
        "byte2" => WidthTag::Byte2,
        "byte" => WidthTag::Byte,
        "word" => WidthTag::Word,
        "ptr" => WidthTag::Ptr,
        _ => WidthTag::Max,
    }
}

fn opcode_of(mnemonic: &str) -> Result<Opcode, CoreError> {
    use Opcode::*;
    Ok(match mnemonic {
        "nop" => Nop,
        "proc" => Proc,
        "ass" => Ass,
        "inc" => Inc,
        "dec" => Dec,
        "ref" => Ref,
        "dref" => Dref,
        "neg" => Neg,
        "not" => Not,
        "inv" => Inv,
        "add" => Add,
        "sub" => Sub,
        "band" => Band,
        "bor" => Bor,
        "xor" => Xor,
        "lsh" => Lsh,
        "rsh" => Rsh,
        "rol" => Rol,
        "ror" => Ror,
        "mul" => Mul,
        "div" => Div,
        "mod" => Mod,
        "eq" => Eq,
        "neq" => Neq,
        "lt" => Lt,
        "gt" => Gt,
        "lte" => Lte,
        "gte" => Gte,
        "and" => And,
        "or" => Or,
        "lbl" => Lbl,
        "jmp" => Jmp,
        "jz" => Jz,
        "loop" => Loop,
        "call" => Call,
        "rtrn" => Rtrn,
        "parm" => Parm,
        "sz" => Sz,
        "cpy" => Cpy,
        _ => return Err(CoreError::UnknownOpcode { pass: "text_ir lowering" }),
    })
}

/// Parses `text` and lowers it into a fresh [`IrContainer`].
pub fn lower(text: &str) -> Result<IrContainer, CoreError> {
    let mut pairs = super::parse_program(text)?;
    let program = pairs.next().expect("grammar guarantees a top-level `program` pair");

    let mut container = IrContainer::new();
    for item in program.into_inner() {
        match item.as_rule() {
            Rule::data_decl => lower_data_decl(&mut container, item)?,
            Rule::struct_decl => lower_struct_decl(&mut container, item)?,
            Rule::routine_decl => lower_routine_decl(&mut container, item)?,
            Rule::EOI => {}
            _ => unreachable!("program only contains top-level items"),
        }
    }
    Ok(container)
}

fn lower_data_decl(container: &mut IrContainer, pair: Pair<Rule>) -> Result<(), CoreError> {
    let mut inner = pair.into_inner();
    let storage = storage_of(inner.next().unwrap());
    let name = inner.next().unwrap().as_str().to_string();
    let width = width_of(inner.next().unwrap());

    let mut prime = Prime::new();
    prime.set_width(width)?;
    if let Some(init) = inner.next() {
        prime.set_value(init.as_str().parse().map_err(|_| CoreError::InvalidConstruction {
            reason: format!("{name}: initialiser is not a valid integer"),
        })?);
    }
    container.add(Object::new(name, storage, ObjectKind::Prime(prime))?)?;
    Ok(())
}

fn lower_struct_decl(container: &mut IrContainer, pair: Pair<Rule>) -> Result<(), CoreError> {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();

    let mut def = crate::ir::StructDefObj::new();
    for member in inner {
        let mut m = member.into_inner();
        let mname = m.next().unwrap().as_str().to_string();
        let mwidth = width_of(m.next().unwrap());
        let mut p = Prime::new();
        p.set_width(mwidth)?;
        def.push_member(mname, crate::ir::ChildShape::Prime(p))?;
    }
    container.add(Object::new(name, StorageClass::Private, ObjectKind::StructDef(def))?)?;
    Ok(())
}

fn lower_routine_decl(container: &mut IrContainer, pair: Pair<Rule>) -> Result<(), CoreError> {
    let mut inner = pair.into_inner().peekable();
    let storage = storage_of(inner.next().unwrap());
    let name = inner.next().unwrap().as_str().to_string();

    let mut param_ids = Vec::new();
    if matches!(inner.peek().map(|p| p.as_rule()), Some(Rule::param_list)) {
        let param_list = inner.next().unwrap();
        for param in param_list.into_inner() {
            let mut p = param.into_inner();
            let pname = p.next().unwrap().as_str().to_string();
            let pwidth = width_of(p.next().unwrap());
            let mut prime = Prime::new();
            prime.set_width(pwidth)?;
            let id = container.add(Object::new(pname, StorageClass::Param, ObjectKind::Prime(prime))?)?;
            param_ids.push(id);
        }
    }
    if matches!(inner.peek().map(|p| p.as_rule()), Some(Rule::width_kw)) {
        inner.next(); // return width: the emitter never consults it directly (results flow through the accumulator)
    }

    let stmts: Vec<Pair<Rule>> = inner.collect();

    // Pre-scan every label this routine defines so a jmp/jz/loop earlier
    // in the body can target one declared later.
    let mut const_counter: u32 = 0;
    for stmt in &stmts {
        if let Some(label) = (*stmt).clone().into_inner().find(|p| p.as_rule() == Rule::label_stmt) {
            let lname = label.into_inner().next().unwrap().as_str().to_string();
            if container.find_opt(&lname).is_none() {
                container.add(Object::new(lname, StorageClass::Label, ObjectKind::Prime(Prime::new()))?)?;
            }
        }
    }

    let mut routine = RoutineObj::new();
    for &id in &param_ids {
        routine.push_param(id);
    }

    for stmt in stmts {
        let inner_stmt = stmt.into_inner().next().unwrap();
        match inner_stmt.as_rule() {
            Rule::auto_decl => {
                let mut a = inner_stmt.into_inner();
                let aname = a.next().unwrap().as_str().to_string();
                let awidth = width_of(a.next().unwrap());
                let mut prime = Prime::new();
                prime.set_width(awidth)?;
                let id = container.add(Object::new(aname, StorageClass::Stack, ObjectKind::Prime(prime))?)?;
                routine.push_auto(id);
            }
            Rule::temp_decl => {
                let mut t = inner_stmt.into_inner();
                let tname = t.next().unwrap().as_str().to_string();
                let twidth = width_of(t.next().unwrap());
                let mut prime = Prime::new();
                prime.set_width(twidth)?;
                container.add(Object::new(tname, StorageClass::Temp, ObjectKind::Prime(prime))?)?;
            }
            Rule::label_stmt => {
                let lname = inner_stmt.into_inner().next().unwrap().as_str().to_string();
                let id = container.find(&lname)?;
                routine.push_instruction(Instruction::new(Opcode::Lbl, None, Some(id), None));
            }
            Rule::instr_stmt => {
                lower_instr_stmt(container, &mut routine, inner_stmt, &mut const_counter)?;
            }
            _ => unreachable!("stmt only wraps auto_decl/label_stmt/instr_stmt"),
        }
    }

    container.add(Object::new(name, storage, ObjectKind::Routine(routine))?)?;
    Ok(())
}

fn lower_instr_stmt(
    container: &mut IrContainer,
    routine: &mut RoutineObj,
    pair: Pair<Rule>,
    const_counter: &mut u32,
) -> Result<(), CoreError> {
    let mut inner = pair.into_inner();
    let mnemonic = inner.next().unwrap().as_str();
    let opcode = opcode_of(mnemonic)?;

    let mut operands = Vec::new();
    if let Some(list) = inner.next() {
        for operand in list.into_inner() {
            operands.push(resolve_operand(container, operand, const_counter)?);
        }
    }

    let instr = build_instruction(opcode, &operands)?;
    routine.push_instruction(instr);
    Ok(())
}

fn resolve_operand(
    container: &mut IrContainer,
    pair: Pair<Rule>,
    const_counter: &mut u32,
) -> Result<crate::ir::ObjectId, CoreError> {
    let token = pair.into_inner().next().unwrap();
    match token.as_rule() {
        Rule::int => {
            let value: i64 = token.as_str().parse().map_err(|_| CoreError::InvalidConstruction {
                reason: format!("{}: not a valid integer literal", token.as_str()),
            })?;
            let name = format!("__const_{}", *const_counter);
            *const_counter += 1;
            let mut p = Prime::new();
            p.set_width(WidthTag::Max)?;
            p.set_value(value);
            container.add(Object::new(name, StorageClass::Const, ObjectKind::Prime(p))?)
        }
        Rule::ident => container.find(token.as_str()),
        _ => unreachable!("operand only wraps int/ident"),
    }
}

/// Positional operand→slot assignment per opcode, matching the three
/// `ObjectId` slots every emitted `Instruction` has (§4.5.5's
/// representative cases list the result first wherever one exists).
fn build_instruction(opcode: Opcode, ops: &[crate::ir::ObjectId]) -> Result<Instruction, CoreError> {
    use Opcode::*;
    let arity_err = || CoreError::InvalidConstruction { reason: format!("wrong operand count for {opcode:?}") };

    Ok(match opcode {
        Nop | Proc => Instruction::new(opcode, None, None, None),

        Inc | Dec => {
            let [x] = ops else { return Err(arity_err()) };
            Instruction::new(opcode, Some(*x), None, None)
        }

        Ass | Neg | Not | Inv | Dref | Sz | Cpy => {
            let [result, left] = ops else { return Err(arity_err()) };
            Instruction::new(opcode, Some(*result), Some(*left), None)
        }

        Ref => match ops {
            [result, left] => Instruction::new(opcode, Some(*result), Some(*left), None),
            [result, left, right] => Instruction::new(opcode, Some(*result), Some(*left), Some(*right)),
            _ => return Err(arity_err()),
        },

        Add | Sub | Band | Bor | Xor | Lsh | Rsh | Rol | Ror | Mul | Div | Mod | Eq | Neq | Lt | Gt | Lte | Gte
        | And | Or => {
            let [result, left, right] = ops else { return Err(arity_err()) };
            Instruction::new(opcode, Some(*result), Some(*left), Some(*right))
        }

        Lbl | Jmp => {
            let [target] = ops else { return Err(arity_err()) };
            Instruction::new(opcode, None, Some(*target), None)
        }

        Jz | Loop => {
            let [cond, target] = ops else { return Err(arity_err()) };
            Instruction::new(opcode, None, Some(*cond), Some(*target))
        }

        Parm => {
            let [arg] = ops else { return Err(arity_err()) };
            Instruction::new(opcode, None, Some(*arg), None)
        }

        Rtrn => match ops {
            [] => Instruction::new(opcode, None, None, None),
            [value] => Instruction::new(opcode, None, Some(*value), None),
            _ => return Err(arity_err()),
        },

        Call => match ops {
            [proc_id] => Instruction::new(opcode, None, Some(*proc_id), None),
            [result, proc_id] => Instruction::new(opcode, Some(*result), Some(*proc_id), None),
            _ => return Err(arity_err()),
        },
    })
}
