// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Compiled program representation.
//!
//! A program is the bytecode image, the interned string-literal table and
//! the final symbol table. The engine's loader places the bytecode at word 0
//! and packs the string table into the heap starting at `HEAP_START`, one
//! length-prefixed run per string, in table order. The compiler bakes the
//! resulting addresses into `PUSH` instructions, so packing here and address
//! assignment there must agree; both go through [`string_words`].


use crate::arena::layout::{HEAP_START, WORD_BYTES, bytes_to_words};
use crate::symbols::SymbolTable;

/// A compiled program: bytecode, string literals and symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// The bytecode image, loaded at word 0.
    pub code: Vec<u64>,
    /// Interned string literals in heap-placement order.
    pub strings: Vec<Vec<u8>>,
    /// Final symbol table: global variables and functions.
    pub symbols: SymbolTable,
}

impl Program {
    /// Number of heap words the packed string table occupies.
    #[must_use]
    pub fn string_table_words(&self) -> u64 {
        self.strings
            .iter()
            .map(|bytes| packed_words(bytes.len()))
            .sum()
    }

    /// Heap addresses assigned to each string, in table order.
    #[must_use]
    pub fn string_addresses(&self) -> Vec<u64> {
        let mut addresses = Vec::with_capacity(self.strings.len());
        let mut next = HEAP_START;
        for bytes in &self.strings {
            addresses.push(next);
            next += packed_words(bytes.len());
        }
        addresses
    }
}

/// Words needed for one length-prefixed string of `len` bytes.
#[must_use]
pub fn packed_words(len: usize) -> u64 {
    1 + bytes_to_words(len as u64)
}

/// Pack a byte string into its in-memory form: a length word followed by
/// `ceil(len/8)` words, byte `i` in bits `8*(i%8)..8*(i%8)+8` of word
/// `i/8 + 1`.
#[must_use]
pub fn string_words(bytes: &[u8]) -> Vec<u64> {
    let mut words = vec![bytes.len() as u64];
    for chunk in bytes.chunks(WORD_BYTES as usize) {
        let mut word = 0u64;
        for (i, byte) in chunk.iter().enumerate() {
            word |= u64::from(*byte) << (i * 8);
        }
        words.push(word);
    }
    words
}

/// Unpack a length-prefixed string from its word form.
///
/// Returns `None` if the word slice is shorter than its length prefix claims.
#[must_use]
pub fn string_bytes(words: &[u64]) -> Option<Vec<u8>> {
    let len = *words.first()? as usize;
    if words.len() < packed_words(len) as usize {
        return None;
    }
    let mut bytes = Vec::with_capacity(len);
    for i in 0..len {
        let word = words[i / WORD_BYTES as usize + 1];
        bytes.push((word >> ((i % WORD_BYTES as usize) * 8)) as u8);
    }
    Some(bytes)
}
