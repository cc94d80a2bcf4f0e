// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Tests for the bytecode format.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::Op;

#[test]
fn every_opcode_round_trips_through_its_byte() {
    for byte in 0..=u8::MAX {
        if let Some(op) = Op::from_u8(byte) {
            assert_eq!(op as u8, byte);
            assert_eq!(u64::from(op), u64::from(byte));
        }
    }
}

#[test]
fn exactly_count_opcodes_decode() {
    let decoded = (0..=u8::MAX).filter(|b| Op::from_u8(*b).is_some()).count();
    assert_eq!(decoded, Op::COUNT);
}

#[test]
fn decoder_ignores_reserved_upper_bits() {
    let word = 0xFFFF_FFFF_FFFF_FF00 | Op::Add as u64;
    assert_eq!(Op::from_word(word), Some(Op::Add));
}

#[test]
fn unknown_opcode_bytes_are_rejected() {
    assert_eq!(Op::from_u8(40), None);
    assert_eq!(Op::from_u8(255), None);
    assert_eq!(Op::from_word(0xF0), None);
}

#[test]
fn operand_counts_match_the_instruction_table() {
    assert_eq!(Op::Halt.operands(), 0);
    assert_eq!(Op::Push.operands(), 1);
    assert_eq!(Op::Jmp.operands(), 1);
    assert_eq!(Op::Jz.operands(), 1);
    assert_eq!(Op::Call.operands(), 2);
    assert_eq!(Op::CallInd.operands(), 1);
    assert_eq!(Op::Ret.operands(), 1);
    assert_eq!(Op::Enter.operands(), 1);
    assert_eq!(Op::Leave.operands(), 1);
    assert_eq!(Op::Add.operands(), 0);
    assert_eq!(Op::SignalReg.operands(), 0);
}

#[test]
fn mnemonics_are_unique() {
    let mut names = std::collections::HashSet::new();
    for byte in 0..=u8::MAX {
        if let Some(op) = Op::from_u8(byte) {
            assert!(names.insert(op.name()), "duplicate mnemonic {}", op.name());
        }
    }
    assert_eq!(names.len(), Op::COUNT);
}
