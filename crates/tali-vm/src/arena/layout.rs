// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Memory layout constants for the arena.
//!
//! The arena is a flat sequence of 64-bit words divided into four regions:
//!
//! ```text
//! [0, CODE_END)             code     read-only after program load
//! [CODE_END, HEAP_START)    globals  compiler-assigned named variables
//! [HEAP_START, STACK_LIMIT) heap     string literals, then open space
//! [STACK_LIMIT, STACK_BASE) stack    grows down from STACK_BASE
//! ```
//!
//! Each region is 1 GiB of backing bytes. The arena is mapped lazily, so the
//! nominal 4 GiB only costs physical pages that are actually touched.

/// Bytes per word.
pub const WORD_BYTES: u64 = 8;

/// One GiB expressed in 64-bit words.
pub const GIB_WORDS: u64 = 1 << 27;

/// End of the code region (exclusive), in words.
pub const CODE_END: u64 = GIB_WORDS;

/// Start of the heap region, in words. Globals occupy `[CODE_END, HEAP_START)`.
pub const HEAP_START: u64 = 2 * GIB_WORDS;

/// Boundary between the heap and stack regions, in words.
///
/// This names the region split for layout bookkeeping only; the engine's
/// stack/heap collision check is against the live heap pointer.
pub const STACK_LIMIT: u64 = 3 * GIB_WORDS;

/// Empty-stack value of `SP`; one past the last arena word.
///
/// The stack grows downward from here, so `STACK_BASE - SP` is the current
/// stack depth in words.
pub const STACK_BASE: u64 = 4 * GIB_WORDS;

/// Total arena size in words.
pub const ARENA_WORDS: u64 = STACK_BASE;

/// Returns true if `addr` is a code-region word.
#[inline]
#[must_use]
pub const fn is_code(addr: u64) -> bool {
    addr < CODE_END
}

/// Returns true if `addr` is a globals-region word.
#[inline]
#[must_use]
pub const fn is_globals(addr: u64) -> bool {
    addr >= CODE_END && addr < HEAP_START
}

/// Returns true if `addr` is a heap-region word.
#[inline]
#[must_use]
pub const fn is_heap(addr: u64) -> bool {
    addr >= HEAP_START && addr < STACK_LIMIT
}

/// Returns true if `addr` is a stack-region word.
#[inline]
#[must_use]
pub const fn is_stack(addr: u64) -> bool {
    addr >= STACK_LIMIT && addr < STACK_BASE
}

/// Returns true if `addr` names any arena word.
#[inline]
#[must_use]
pub const fn is_valid(addr: u64) -> bool {
    addr < ARENA_WORDS
}

/// Number of words needed to hold `bytes` bytes, rounded up.
#[inline]
#[must_use]
pub const fn bytes_to_words(bytes: u64) -> u64 {
    bytes.div_ceil(WORD_BYTES)
}
