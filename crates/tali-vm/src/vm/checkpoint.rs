// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Deep snapshots of engine state.
//!
//! A checkpoint captures the registers, flags, handler table, counters and
//! the arena contents. The arena is 4 GiB nominal but starts all-zero and is
//! written sparsely, so the snapshot stores the code image plus the dirty
//! spans of the writable regions; together those are the full arena state.
//!
//! The OS-level signal latch is deliberately not captured: snapshots are
//! pure VM state.

use crate::arena::DirtySpans;
use crate::arena::layout::{HEAP_START, STACK_BASE};
use crate::bytecode::Op;

use super::{Console, Engine, HANDLER_SLOTS, Profile};

/// Engine register file, as captured by a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub(crate) ip: u64,
    pub(crate) sp: u64,
    pub(crate) bp: u64,
    pub(crate) hp: u64,
    pub(crate) int_enabled: bool,
    pub(crate) halted: bool,
}

/// A contiguous run of captured words.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    start: u64,
    words: Vec<u64>,
}

impl Span {
    fn capture<C: Console>(engine: &Engine<C>, start: u64, end: u64) -> Self {
        Self {
            start,
            words: engine.arena().copy_words(start, end - start),
        }
    }

    const fn end(&self) -> u64 {
        self.start + self.words.len() as u64
    }
}

/// A deep snapshot of one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    registers: Registers,
    handlers: [u64; HANDLER_SLOTS],
    steps: u64,
    profile: Profile,
    code: Span,
    globals: Option<Span>,
    heap: Span,
    stack: Span,
}

impl Checkpoint {
    /// Capture the complete state of an engine.
    #[must_use]
    pub fn capture<C: Console>(engine: &Engine<C>) -> Self {
        let dirty = engine.arena().dirty();
        Self {
            registers: engine.registers(),
            handlers: *engine.handlers(),
            steps: engine.steps(),
            profile: *engine.profile(),
            code: Span::capture(engine, 0, engine.arena().code_len()),
            globals: dirty
                .globals
                .map(|(lo, hi)| Span::capture(engine, lo, hi)),
            heap: Span::capture(engine, HEAP_START, dirty.heap_end),
            stack: Span::capture(engine, dirty.stack_low, STACK_BASE),
        }
    }

    /// Overwrite an engine's state with this snapshot.
    ///
    /// Everything the engine wrote since (or before, for a foreign engine) is
    /// zeroed back before the captured spans are written, so the arena ends
    /// up word-for-word identical to capture time.
    pub fn restore<C: Console>(&self, engine: &mut Engine<C>) {
        let arena = engine.arena_mut();

        // Zero the target's dirty state first.
        arena.zero_words(0, arena.code_len());
        arena.clear_writable();

        // Write the captured spans back.
        arena.restore_words(self.code.start, &self.code.words);
        if let Some(span) = &self.globals {
            arena.restore_words(span.start, &span.words);
        }
        arena.restore_words(self.heap.start, &self.heap.words);
        arena.restore_words(self.stack.start, &self.stack.words);

        arena.set_state(
            self.code.words.len() as u64,
            DirtySpans {
                globals: self.globals.as_ref().map(|span| (span.start, span.end())),
                heap_end: self.heap.end(),
                stack_low: self.stack.start,
            },
        );

        engine.set_registers(self.registers);
        engine.restore_handlers(self.handlers);
        engine.set_counters(self.steps, self.profile);
    }

    /// Captured instruction pointer.
    #[must_use]
    pub const fn ip(&self) -> u64 {
        self.registers.ip
    }

    /// Captured stack pointer.
    #[must_use]
    pub const fn sp(&self) -> u64 {
        self.registers.sp
    }

    /// Captured total-instruction counter.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Captured per-opcode count.
    #[must_use]
    pub const fn op_count(&self, op: Op) -> u64 {
        self.profile.count(op)
    }
}
