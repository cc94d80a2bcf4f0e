// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Checkpoint capture and restore.

use super::*;
use crate::arena::layout::{CODE_END, HEAP_START};
use crate::vm::Checkpoint;
use crate::bytecode::Op::{Add, Halt, Push, Store};

fn sample_program() -> Vec<u64> {
    let global = CODE_END + 4;
    vec![
        w(Push),
        11,
        w(Push),
        global,
        w(Store),
        w(Push),
        5,
        w(Push),
        6,
        w(Add),
        w(Push),
        HEAP_START + 9,
        w(Store),
        w(Push),
        1,
        w(Push),
        2,
        w(Add),
        w(Halt),
    ]
}

#[test]
fn capture_then_restore_is_a_no_op() {
    let mut vm = load_code(sample_program());
    assert_eq!(vm.run_budget(4), Ok(RunOutcome::HitLimit));

    let before = Checkpoint::capture(&vm);
    before.restore(&mut vm);
    let after = Checkpoint::capture(&vm);

    assert_eq!(before, after);
    assert_eq!(vm.ip(), before.ip());
    assert_eq!(vm.sp(), before.sp());
}

#[test]
fn restore_rewinds_execution_to_the_captured_state() {
    let global = CODE_END + 4;
    let mut vm = load_code(sample_program());

    // Stop mid-program, after the global store
    assert_eq!(vm.run_budget(3), Ok(RunOutcome::HitLimit));
    let snapshot = Checkpoint::capture(&vm);

    // First continuation to the terminal state
    assert_eq!(vm.run(), Ok(RunOutcome::Halted));
    let ip1 = vm.ip();
    let depth1 = vm.depth();
    let top1 = vm.top().unwrap();
    let global1 = vm.read_memory(global).unwrap();
    let heap1 = vm.read_memory(HEAP_START + 9).unwrap();
    let steps1 = vm.steps();

    // Rewind and run the same continuation again
    snapshot.restore(&mut vm);
    assert_eq!(vm.steps(), snapshot.steps());
    assert_eq!(vm.run(), Ok(RunOutcome::Halted));

    assert_eq!(vm.ip(), ip1);
    assert_eq!(vm.depth(), depth1);
    assert_eq!(vm.top().unwrap(), top1);
    assert_eq!(vm.read_memory(global).unwrap(), global1);
    assert_eq!(vm.read_memory(HEAP_START + 9).unwrap(), heap1);
    assert_eq!(vm.steps(), steps1);
}

#[test]
fn restore_erases_writes_made_after_capture() {
    let mut vm = load_code(vec![w(Push), 1, w(Halt)]);
    assert_eq!(vm.run(), Ok(RunOutcome::Halted));
    let snapshot = Checkpoint::capture(&vm);

    // Scribble over globals and heap after the capture
    vm.write_memory(CODE_END + 100, 0xBAD).unwrap();
    vm.write_memory(HEAP_START + 100, 0xBAD).unwrap();

    snapshot.restore(&mut vm);
    assert_eq!(vm.read_memory(CODE_END + 100).unwrap(), 0);
    assert_eq!(vm.read_memory(HEAP_START + 100).unwrap(), 0);
    assert_eq!(vm.top().unwrap(), 1);
}

#[test]
fn restore_carries_the_handler_table() {
    let mut vm = load_code(vec![
        w(Push),
        10,
        w(Push),
        50,
        w(Op::SignalReg),
        w(Halt),
    ]);
    assert_eq!(vm.run(), Ok(RunOutcome::Halted));
    let snapshot = Checkpoint::capture(&vm);

    // Load a fresh program; the handler table is cleared
    vm.load(&crate::program::Program {
        code: vec![w(Halt)],
        strings: Vec::new(),
        symbols: crate::symbols::SymbolTable::new(),
    })
    .unwrap();
    assert_eq!(vm.handler(10), 0);

    snapshot.restore(&mut vm);
    assert_eq!(vm.handler(10), 50);
}

#[test]
fn restore_carries_profiling_counters() {
    let mut vm = load_code(vec![w(Push), 1, w(Push), 2, w(Add), w(Halt)]);
    vm.set_profiling(true);
    assert_eq!(vm.run(), Ok(RunOutcome::Halted));

    let snapshot = Checkpoint::capture(&vm);
    assert_eq!(snapshot.op_count(Op::Push), 2);

    // Wipe the counters by reloading, then restore
    vm.load(&crate::program::Program {
        code: vec![w(Halt)],
        strings: Vec::new(),
        symbols: crate::symbols::SymbolTable::new(),
    })
    .unwrap();
    snapshot.restore(&mut vm);
    assert_eq!(vm.profile().count(Op::Push), 2);
    assert_eq!(vm.steps(), snapshot.steps());
}
