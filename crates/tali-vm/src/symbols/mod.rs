// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Symbol table mapping names to variables and functions.
//!
//! The compiler records every global variable and function here; the final
//! table travels with the compiled program so an embedder can locate
//! definitions by name. Iteration follows insertion order, which keeps
//! program dumps and tests deterministic.

#[cfg(test)]
mod symbols_test;

use std::collections::HashMap;

/// What a symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A named memory word in the globals region.
    Variable,
    /// A function body in the code region.
    Function,
}

/// A single named definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    /// The symbol's name.
    pub name: String,
    /// Variable or function.
    pub kind: SymbolKind,
    /// Globals-region word for variables, code-region word for functions.
    pub address: u64,
    /// Parameter names, functions only.
    pub params: Vec<String>,
}

impl SymbolEntry {
    /// Returns true if this entry names a variable.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.kind == SymbolKind::Variable
    }

    /// Returns true if this entry names a function.
    #[must_use]
    pub fn is_function(&self) -> bool {
        self.kind == SymbolKind::Function
    }
}

/// Name-keyed symbol mapping with insertion-order iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: HashMap<String, SymbolEntry>,
    order: Vec<String>,
}

impl SymbolTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or update a variable.
    ///
    /// Redefinition updates the entry in place without changing its position
    /// in the iteration order.
    pub fn define_variable(&mut self, name: &str, address: u64) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.kind = SymbolKind::Variable;
            entry.address = address;
            entry.params.clear();
            return;
        }
        self.order.push(name.to_owned());
        self.entries.insert(
            name.to_owned(),
            SymbolEntry {
                name: name.to_owned(),
                kind: SymbolKind::Variable,
                address,
                params: Vec::new(),
            },
        );
    }

    /// Define or update a function.
    pub fn define_function(&mut self, name: &str, code_address: u64, params: Vec<String>) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.kind = SymbolKind::Function;
            entry.address = code_address;
            entry.params = params;
            return;
        }
        self.order.push(name.to_owned());
        self.entries.insert(
            name.to_owned(),
            SymbolEntry {
                name: name.to_owned(),
                kind: SymbolKind::Function,
                address: code_address,
                params,
            },
        );
    }

    /// Look up a symbol by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.get(name)
    }

    /// Returns true if the name is defined.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }

    /// All variables in insertion order.
    pub fn variables(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.iter().filter(|entry| entry.is_variable())
    }

    /// All functions in insertion order.
    pub fn functions(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.iter().filter(|entry| entry.is_function())
    }

    /// Merge another table into this one; `other`'s entries win on collision.
    pub fn merge(&mut self, other: &Self) {
        for entry in other.iter() {
            match entry.kind {
                SymbolKind::Variable => self.define_variable(&entry.name, entry.address),
                SymbolKind::Function => {
                    self.define_function(&entry.name, entry.address, entry.params.clone());
                }
            }
        }
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all symbols.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
