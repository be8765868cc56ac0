//! Textual disassembly used by the CLI and by traces.

use core::fmt::Write;

use crate::{Program, Value};

/// Multi-line listing with a constant table and one line per instruction.
pub fn disassemble_full(program: &Program, title: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "== {title} == (consts={}, words={})",
        program.constants.len(),
        program.instructions.len()
    );

    if !program.constants.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, ";; constants");
        for (idx, value) in program.constants.iter().enumerate() {
            let _ = writeln!(out, "const[{idx:04}] = {}", show_const(value));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, ";; code");
    out.push_str(&disassemble_compact(program));
    out
}

/// One line per instruction, with a preview of the referenced constant.
pub fn disassemble_compact(program: &Program) -> String {
    let mut out = String::new();
    for ins in program.decode() {
        match ins {
            Ok(ins) => match ins.operand {
                Some(ix) => {
                    let preview = program.constant(ix).map_or_else(|| "<out of range>".to_owned(), show_const);
                    let _ = writeln!(out, "{:04}: {:<10} {ix:<4} ;; {preview}", ins.pc, ins.opcode.mnemonic());
                }
                None => {
                    let _ = writeln!(out, "{:04}: {}", ins.pc, ins.opcode.mnemonic());
                }
            },
            Err(e) => {
                let _ = writeln!(out, ";; error: {e}");
            }
        }
    }
    out
}

fn show_const(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().count() > 64 => {
            let head: String = s.chars().take(64).collect();
            format!("{head:?}…")
        }
        Value::String(s) => format!("{s:?}"),
        Value::Char(c) => format!("{c:?}"),
        other => format!("{other}"),
    }
}
