// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Jumps, calls, frames and their faults.

use super::*;
use crate::arena::layout::CODE_END;
use crate::bytecode::Op::{
    Add, BpLoad, BpStore, Call, CallInd, Enter, Halt, Jmp, Jz, Leave, Mul, Push, Ret,
};

#[test]
fn jmp_skips_code() {
    // 0: JMP 4; 2: PUSH 1 (skipped); 4: PUSH 2; HALT
    let vm = run_code(vec![w(Jmp), 4, w(Push), 1, w(Push), 2, w(Halt)]);
    assert_eq!(vm.depth(), 1);
    assert_eq!(vm.top().unwrap(), 2);
}

#[test]
fn jz_branches_only_on_zero() {
    // Condition zero: branch taken
    let vm = run_code(vec![w(Push), 0, w(Jz), 6, w(Push), 111, w(Push), 222, w(Halt)]);
    assert_eq!(vm.top().unwrap(), 222);
    assert_eq!(vm.depth(), 1);

    // Condition non-zero: fall through
    let vm = run_code(vec![w(Push), 1, w(Jz), 6, w(Push), 111, w(Halt)]);
    assert_eq!(vm.top().unwrap(), 111);
}

#[test]
fn jump_outside_code_region_faults() {
    assert_eq!(run_fault(vec![w(Jmp), CODE_END]), Fault::BadJump(CODE_END));
    assert_eq!(
        run_fault(vec![w(Push), 0, w(Jz), u64::MAX]),
        Fault::BadJump(u64::MAX)
    );
}

#[test]
fn unknown_opcode_faults() {
    assert_eq!(run_fault(vec![0xFE, w(Halt)]), Fault::UnknownOpcode(0xFE));
}

/// A call frame nets exactly one result word onto the caller's stack.
///
/// Callee doubles its single argument. Layout:
/// ```text
/// 0: PUSH 21
/// 2: CALL 7, 1
/// 5: HALT          (result on top)
/// 6: (unused)
/// 7: ENTER 1       callee: one frame slot for the parameter
/// 9:   PUSH -3; BP_LOAD   copy incoming arg into slot 0
/// 12:  PUSH 0; BP_STORE
/// 15:  PUSH 0; BP_LOAD    parameter 0
/// 18:  PUSH 2; MUL
/// 21: LEAVE 1
/// 23: RET 1
/// ```
#[test]
fn call_frame_nets_one_result() {
    // Frame index -3 reaches the single argument above the saved BP:
    // BP - 1 - (1 - 1 - 2) wrapping = BP + 2.
    let arg_index = 0u64.wrapping_sub(3);
    let code = vec![
        w(Push),
        21,
        w(Call),
        7,
        1,
        w(Halt),
        0,
        w(Enter),
        1,
        w(Push),
        arg_index,
        w(BpLoad),
        w(Push),
        0,
        w(BpStore),
        w(Push),
        0,
        w(BpLoad),
        w(Push),
        2,
        w(Mul),
        w(Leave),
        1,
        w(Ret),
        1,
    ];
    let vm = run_code(code);
    assert_eq!(vm.depth(), 1, "call must net exactly one word");
    assert_eq!(vm.top().unwrap(), 42);
}

#[test]
fn call_ind_consumes_target_from_stack() {
    // Same callee shape, but the target arrives on the stack.
    let code = vec![
        w(Push),
        5,      // argument
        w(Push),
        8,      // callee address
        w(CallInd),
        1,
        w(Halt),
        0,
        // 8: callee: return arg + 1 without touching its frame
        w(Enter),
        0,
        w(Push),
        0u64.wrapping_sub(3),
        w(BpLoad),
        w(Push),
        1,
        w(Add),
        w(Leave),
        0,
        w(Ret),
        1,
    ];
    let vm = run_code(code);
    assert_eq!(vm.depth(), 1);
    assert_eq!(vm.top().unwrap(), 6);
}

#[test]
fn nested_calls_restore_caller_frames() {
    // outer(x) = inner(x) + 1; inner(x) = x * 10
    let arg_index = 0u64.wrapping_sub(3);
    let code = vec![
        w(Push),
        4,       // x = 4
        w(Call),
        7,       // outer
        1,
        w(Halt), // 5
        0,
        // 7: outer
        w(Enter),
        0,
        w(Push),
        arg_index,
        w(BpLoad),  // fetch x
        w(Call),
        22,         // inner
        1,
        w(Push),
        1,
        w(Add),
        w(Leave),
        0,
        w(Ret),
        1,
        // 22: inner
        w(Enter),
        0,
        w(Push),
        arg_index,
        w(BpLoad),
        w(Push),
        10,
        w(Mul),
        w(Leave),
        0,
        w(Ret),
        1,
    ];
    let vm = run_code(code);
    assert_eq!(vm.depth(), 1);
    assert_eq!(vm.top().unwrap(), 41);
    assert_eq!(vm.bp(), crate::arena::layout::STACK_BASE);
}

#[test]
fn enter_reserves_frame_slots() {
    let vm = run_code(vec![
        w(Push),
        99,
        w(Enter),
        3,
        w(Push),
        7,
        w(Leave),
        3,
        w(Halt),
    ]);
    // LEAVE keeps the frame's result on top; the 99 pushed before ENTER
    // is still below it.
    assert_eq!(vm.depth(), 2);
    assert_eq!(vm.top().unwrap(), 7);
}

#[test]
fn bp_store_and_load_round_trip_frame_slots() {
    let vm = run_code(vec![
        w(Enter),
        2,
        w(Push),
        123,
        w(Push),
        1,
        w(BpStore),
        w(Push),
        1,
        w(BpLoad),
        w(Leave),
        2,
        w(Halt),
    ]);
    assert_eq!(vm.top().unwrap(), 123);
}

#[test]
fn enter_with_absurd_slot_counts_overflows() {
    // Reservation count underflows SP entirely
    assert_eq!(
        run_fault(vec![w(Enter), u64::MAX, w(Halt)]),
        Fault::StackOverflow
    );
    // Reservation would land on the heap pointer
    let to_heap = crate::arena::layout::STACK_BASE - crate::arena::layout::HEAP_START;
    assert_eq!(
        run_fault(vec![w(Enter), to_heap, w(Halt)]),
        Fault::StackOverflow
    );
}

#[test]
fn leave_without_frame_faults() {
    assert_eq!(
        run_fault(vec![w(Push), 1, w(Leave), 0, w(Halt)]),
        Fault::StackUnderflow
    );
}

#[test]
fn bp_access_outside_stack_faults() {
    // At toplevel BP sits at STACK_BASE; slot 0 would be a stack word, but
    // a huge index leaves the stack region.
    let fault = run_fault(vec![w(Push), 1, w(Push), 1 << 40, w(BpLoad), w(Halt)]);
    assert!(matches!(fault, Fault::OutOfBounds(_)));
}
