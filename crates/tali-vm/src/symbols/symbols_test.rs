// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Tests for the symbol table.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{SymbolKind, SymbolTable};

#[test]
fn lookup_finds_defined_symbols() {
    let mut table = SymbolTable::new();
    table.define_variable("x", 100);
    table.define_function("f", 42, vec!["a".to_owned(), "b".to_owned()]);

    let x = table.lookup("x").unwrap();
    assert_eq!(x.kind, SymbolKind::Variable);
    assert_eq!(x.address, 100);

    let f = table.lookup("f").unwrap();
    assert_eq!(f.kind, SymbolKind::Function);
    assert_eq!(f.address, 42);
    assert_eq!(f.params, vec!["a".to_owned(), "b".to_owned()]);

    assert!(table.lookup("missing").is_none());
}

#[test]
fn iteration_preserves_insertion_order() {
    let mut table = SymbolTable::new();
    table.define_variable("c", 3);
    table.define_variable("a", 1);
    table.define_function("b", 2, Vec::new());

    let names: Vec<&str> = table.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["c", "a", "b"]);
}

#[test]
fn redefinition_updates_in_place() {
    let mut table = SymbolTable::new();
    table.define_variable("a", 1);
    table.define_variable("b", 2);
    table.define_variable("a", 99);

    assert_eq!(table.len(), 2);
    assert_eq!(table.lookup("a").unwrap().address, 99);

    // "a" keeps its original position
    let names: Vec<&str> = table.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn kind_filters_select_by_kind() {
    let mut table = SymbolTable::new();
    table.define_variable("v1", 1);
    table.define_function("f1", 2, Vec::new());
    table.define_variable("v2", 3);

    let vars: Vec<&str> = table.variables().map(|e| e.name.as_str()).collect();
    assert_eq!(vars, vec!["v1", "v2"]);

    let funcs: Vec<&str> = table.functions().map(|e| e.name.as_str()).collect();
    assert_eq!(funcs, vec!["f1"]);
}

#[test]
fn merge_overrides_on_collision() {
    let mut left = SymbolTable::new();
    left.define_variable("x", 1);
    left.define_variable("y", 2);

    let mut right = SymbolTable::new();
    right.define_variable("y", 20);
    right.define_function("z", 30, Vec::new());

    left.merge(&right);
    assert_eq!(left.len(), 3);
    assert_eq!(left.lookup("y").unwrap().address, 20);
    assert_eq!(left.lookup("z").unwrap().address, 30);
}

#[test]
fn clear_empties_the_table() {
    let mut table = SymbolTable::new();
    table.define_variable("x", 1);
    assert!(!table.is_empty());

    table.clear();
    assert!(table.is_empty());
    assert_eq!(table.len(), 0);
    assert!(table.lookup("x").is_none());
}
