// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Stack manipulation opcodes and the stack discipline faults.

use super::*;
use crate::arena::layout::STACK_BASE;
use crate::bytecode::Op::{Dup, Halt, Pop, Push, Sub, Swap};

#[test]
fn push_and_pop_track_depth() {
    let vm = run_code(vec![w(Push), 1, w(Push), 2, w(Push), 3, w(Pop), w(Halt)]);
    assert_eq!(vm.depth(), 2);
    assert_eq!(vm.top().unwrap(), 2);
    assert_eq!(vm.sp(), STACK_BASE - 2);
}

#[test]
fn dup_duplicates_the_top() {
    let vm = run_code(vec![w(Push), 9, w(Dup), w(Sub), w(Halt)]);
    assert_eq!(vm.depth(), 1);
    assert_eq!(vm.top().unwrap(), 0);
}

#[test]
fn swap_exchanges_the_top_two() {
    let vm = run_code(vec![w(Push), 20, w(Push), 8, w(Swap), w(Sub), w(Halt)]);
    // After SWAP the subtraction sees 8 - 20
    assert_eq!(vm.top().unwrap(), 8u64.wrapping_sub(20));
}

#[test]
fn pop_on_empty_stack_underflows() {
    assert_eq!(run_fault(vec![w(Pop), w(Halt)]), Fault::StackUnderflow);
    assert_eq!(run_fault(vec![w(Dup), w(Halt)]), Fault::StackUnderflow);
    assert_eq!(
        run_fault(vec![w(Push), 1, w(Swap), w(Halt)]),
        Fault::StackUnderflow
    );
}

#[test]
fn fault_preserves_engine_state_for_inspection() {
    let mut vm = load_code(vec![w(Push), 11, w(Push), 22, w(Push), 0, w(Op::Div), w(Halt)]);
    assert_eq!(vm.run(), Err(Fault::DivisionByZero));

    // Operands were consumed, the rest of the stack is intact
    assert_eq!(vm.depth(), 1);
    assert_eq!(vm.top().unwrap(), 11);
    assert!(!vm.halted());
    assert_eq!(vm.steps(), 4);
}

#[test]
fn halt_preserves_stack_and_resume_re_halts() {
    let mut vm = load_code(vec![w(Push), 7, w(Halt)]);
    assert_eq!(vm.run(), Ok(RunOutcome::Halted));
    assert_eq!(vm.top().unwrap(), 7);
    assert!(vm.halted());

    // Resuming a halted engine with nothing pending halts again in place
    assert_eq!(vm.run(), Ok(RunOutcome::Halted));
    assert_eq!(vm.top().unwrap(), 7);
    assert_eq!(vm.depth(), 1);
}
