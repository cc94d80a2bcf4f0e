// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Human-readable bytecode listings.

use core::fmt::Write;

use crate::bytecode::Op;

/// Render a code image one instruction per line.
///
/// Words that decode to no known opcode are shown as raw data; the listing
/// then resynchronizes at the next word.
#[must_use]
pub fn disassemble(code: &[u64]) -> String {
    let mut out = String::new();
    let mut at = 0;

    while at < code.len() {
        let word = code[at];
        let Some(op) = Op::from_word(word) else {
            let _ = writeln!(out, "{at:6}: .word {word:#x}");
            at += 1;
            continue;
        };

        let _ = write!(out, "{at:6}: {}", op.name());
        for i in 0..op.operands() {
            match code.get(at + 1 + i) {
                Some(operand) => {
                    let _ = write!(out, " {operand}");
                }
                None => {
                    let _ = write!(out, " <truncated>");
                }
            }
        }
        let _ = writeln!(out);

        at += 1 + op.operands();
    }

    out
}

#[cfg(test)]
mod disassemble_test {
    #![allow(clippy::unwrap_used)]

    use super::disassemble;
    use crate::bytecode::Op;

    fn w(op: Op) -> u64 {
        op as u64
    }

    #[test]
    fn lists_one_instruction_per_line() {
        let code = vec![w(Op::Push), 42, w(Op::Call), 7, 2, w(Op::Halt)];
        let listing = disassemble(&code);
        let lines: Vec<&str> = listing.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("PUSH 42"));
        assert!(lines[1].contains("CALL 7 2"));
        assert!(lines[2].contains("HALT"));
    }

    #[test]
    fn unknown_words_render_as_data() {
        let listing = disassemble(&[0xFE, w(Op::Halt)]);
        assert!(listing.contains(".word 0xfe"));
        assert!(listing.contains("HALT"));
    }

    #[test]
    fn truncated_operands_are_flagged() {
        let listing = disassemble(&[w(Op::Push)]);
        assert!(listing.contains("<truncated>"));
    }
}
