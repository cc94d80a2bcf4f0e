// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Tests for the execution engine.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod arithmetic_test;
mod checkpoint_test;
mod control_test;
mod stack_test;

use super::*;
use crate::bytecode::Op;
use crate::program::Program;

/// Opcode word shorthand for hand-assembled programs.
pub fn w(op: Op) -> u64 {
    op as u64
}

/// Engine with a capturing console.
pub fn engine() -> Engine<BufferConsole> {
    Engine::with_console(BufferConsole::default()).expect("arena mapping failed")
}

/// Load raw code into a fresh engine.
pub fn load_code(code: Vec<u64>) -> Engine<BufferConsole> {
    let mut vm = engine();
    vm.load(&Program {
        code,
        strings: Vec::new(),
        symbols: crate::symbols::SymbolTable::new(),
    })
    .unwrap();
    vm
}

/// Run raw code to completion and return the engine for inspection.
pub fn run_code(code: Vec<u64>) -> Engine<BufferConsole> {
    let mut vm = load_code(code);
    assert_eq!(vm.run(), Ok(RunOutcome::Halted));
    vm
}

/// Run raw code and return the fault it must produce.
pub fn run_fault(code: Vec<u64>) -> Fault {
    let mut vm = load_code(code);
    vm.run().expect_err("program should fault")
}
