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

//! NASM register mnemonics by width, and the other fixed strings the
//! emitter stitches into assembler lines.

use crate::emit::register::Register;
use crate::target::Mode;

/// Renders `reg` at `width_bytes` (1, 2, 4, or 8). `mode` only matters to
/// reject an 8-byte name in protected mode, where it can never be reached
/// (the layout pass already turned that into `InvalidWidth`).
pub fn register_name(reg: Register, width_bytes: u32, mode: Mode) -> String {
    let long = mode == Mode::Long;
    match reg {
        Register::Accumulator => sized("al", "ax", "eax", "rax", width_bytes),
        Register::Base => sized("bl", "bx", "ebx", "rbx", width_bytes),
        Register::Counter => sized("cl", "cx", "ecx", "rcx", width_bytes),
        Register::Data => sized("dl", "dx", "edx", "rdx", width_bytes),
        Register::SourceIndex => sized_index("sil", "si", "esi", "rsi", width_bytes, long),
        Register::DestIndex => sized_index("dil", "di", "edi", "rdi", width_bytes, long),
        Register::BasePointer => sized("bpl", "bp", "ebp", "rbp", width_bytes),
        Register::StackPointer => sized("spl", "sp", "esp", "rsp", width_bytes),
        Register::Ext(n) => ext_reg(n, width_bytes),
    }
}

fn sized(b: &'static str, w: &'static str, dw: &'static str, qw: &'static str, width: u32) -> String {
    match width {
        1 => b.to_string(),
        2 => w.to_string(),
        4 => dw.to_string(),
        8 => qw.to_string(),
        _ => dw.to_string(),
    }
}

fn sized_index(
    b: &'static str,
    w: &'static str,
    dw: &'static str,
    qw: &'static str,
    width: u32,
    long_mode_rex_byte: bool,
) -> String {
    if width == 1 && !long_mode_rex_byte {
        // si/di have no legacy 8-bit form without a REX prefix; fall back
        // to the 16-bit name, which is always addressable.
        return w.to_string();
    }
    sized(b, w, dw, qw, width)
}

fn ext_reg(n: u8, width: u32) -> String {
    let suffix = match width {
        1 => "b",
        2 => "w",
        4 => "d",
        _ => "",
    };
    format!("r{n}{suffix}")
}

pub const HEADER_COMMENT: &str = "; Generated by mplgen — do not edit by hand.";
pub const TRAILER_COMMENT: &str = "; End of MPL generated file";
pub const DATA_SECTION: &str = "section .data";
pub const CODE_SECTION: &str = "section .code";
