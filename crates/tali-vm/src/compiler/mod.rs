// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Single-pass compiler from s-expression trees to bytecode.
//!
//! The compiler walks the parsed tree once and emits directly into a growing
//! code buffer. Function bodies are queued and emitted after the main
//! expression's HALT; call sites record fix-ups that are patched once all
//! body addresses are known. String literals are interned into a table whose
//! heap addresses are baked into PUSH instructions.
//!
//! Every expression nets exactly one word onto the stack; sequencing forms
//! POP intermediate results.
//!
//! ## Calling convention
//!
//! The caller pushes arguments left to right and emits `CALL target, n`.
//! The callee opens its frame with `ENTER k` where `k` counts parameters
//! plus temporaries, then a generated prologue copies the incoming arguments
//! into frame slots `0..n` so parameter `i` reads as frame index `i`.
//! Temporaries continue at index `n`. Frame indices address `BP - 1 - idx`
//! with wrapping arithmetic; the prologue uses indices below zero (in two's
//! complement) to reach the argument words above the saved BP.


pub mod disassemble;
mod fn_compile;
mod forms;

use std::collections::HashMap;

use crate::arena::layout::CODE_END;
use crate::bytecode::Op;
use crate::program::{Program, packed_words};
use crate::reader::Node;
use crate::symbols::SymbolTable;

use self::fn_compile::PendingBody;

/// Compilation error. Emission aborts on the first error; no partial
/// bytecode is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A symbol was referenced but never bound.
    UnboundSymbol(String),
    /// A list head names neither a special form nor a defined function.
    UnknownOperator(String),
    /// A name was defined twice in the same scope.
    Redefinition(String),
    /// A function call with the wrong number of arguments.
    ArityMismatch {
        /// Callee name.
        name: String,
        /// Number of declared parameters.
        expected: usize,
        /// Number of arguments at the call site.
        got: usize,
    },
    /// A special form used with the wrong shape.
    Malformed {
        /// The form's name.
        form: &'static str,
        /// What was wrong with it.
        reason: &'static str,
    },
    /// `define-int` with a signal number outside 1..=31.
    SignalOutOfRange(i64),
    /// A call or `function-address` fix-up that never resolved.
    UndefinedFunction(String),
    /// A function name used where a value is expected.
    FunctionAsValue(String),
    /// The empty list `()` has no meaning.
    EmptyList,
    /// An empty program has nothing to compile.
    EmptyProgram,
}

impl core::fmt::Display for CompileError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnboundSymbol(name) => write!(f, "unbound symbol: {name}"),
            Self::UnknownOperator(name) => write!(f, "unknown operator: {name}"),
            Self::Redefinition(name) => {
                write!(f, "already defined in current scope: {name}")
            }
            Self::ArityMismatch {
                name,
                expected,
                got,
            } => write!(f, "{name} expects {expected} arguments, got {got}"),
            Self::Malformed { form, reason } => write!(f, "{form}: {reason}"),
            Self::SignalOutOfRange(sig) => {
                write!(f, "signal number {sig} outside 1..=31")
            }
            Self::UndefinedFunction(name) => write!(f, "undefined function: {name}"),
            Self::FunctionAsValue(name) => {
                write!(f, "cannot use function as value: {name}")
            }
            Self::EmptyList => write!(f, "empty list not allowed"),
            Self::EmptyProgram => write!(f, "nothing to compile"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Where a bound name lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    /// A word in the globals region.
    Global(u64),
    /// A slot in the current function frame.
    Frame(u64),
}

/// One level of the scope stack.
#[derive(Debug, Default)]
struct Scope {
    bindings: HashMap<String, Binding>,
}

/// String-literal interning: byte-identical literals share one heap slot.
#[derive(Debug)]
struct StringPool {
    table: Vec<Vec<u8>>,
    addresses: HashMap<Vec<u8>, u64>,
    next_addr: u64,
}

impl StringPool {
    fn new() -> Self {
        Self {
            table: Vec::new(),
            addresses: HashMap::new(),
            next_addr: crate::arena::layout::HEAP_START,
        }
    }

    /// Heap address of `bytes`, interning it on first sight.
    ///
    /// Addresses mirror the loader's packing: each literal occupies its
    /// length word plus the packed data words, in table order.
    fn intern(&mut self, bytes: &[u8]) -> u64 {
        if let Some(addr) = self.addresses.get(bytes) {
            return *addr;
        }
        let addr = self.next_addr;
        self.next_addr += packed_words(bytes.len());
        self.addresses.insert(bytes.to_vec(), addr);
        self.table.push(bytes.to_vec());
        addr
    }
}

/// A call site or address reference awaiting a function's body address.
#[derive(Debug)]
struct Fixup {
    /// Offset of the operand word to patch.
    at: usize,
    /// Function (or handler label) it refers to.
    name: String,
}

/// The compiler. Stateful but idempotent per input: after a successful
/// compile, call [`Compiler::reset`] before compiling again.
#[derive(Debug)]
pub struct Compiler {
    code: Vec<u64>,
    scopes: Vec<Scope>,
    next_global: u64,
    in_function: bool,
    frame_next: u64,
    /// Declared functions and their arity, known from the moment the
    /// `define-func` form is seen so recursive calls resolve.
    functions: HashMap<String, usize>,
    pending: Vec<PendingBody>,
    fixups: Vec<Fixup>,
    resolved: HashMap<String, u64>,
    strings: StringPool,
    symbols: SymbolTable,
}

impl Compiler {
    /// A compiler with an empty global scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            scopes: vec![Scope::default()],
            next_global: CODE_END,
            in_function: false,
            frame_next: 0,
            functions: HashMap::new(),
            pending: Vec::new(),
            fixups: Vec::new(),
            resolved: HashMap::new(),
            strings: StringPool::new(),
            symbols: SymbolTable::new(),
        }
    }

    /// Compile a single expression into a runnable program.
    pub fn compile(&mut self, expr: &Node) -> Result<Program, CompileError> {
        self.compile_program(core::slice::from_ref(expr))
    }

    /// Compile a sequence of toplevel expressions.
    ///
    /// All but the last result are popped; the last stays on the stack when
    /// the program halts. Queued function bodies are emitted after the HALT
    /// and every recorded call site is patched.
    pub fn compile_program(&mut self, exprs: &[Node]) -> Result<Program, CompileError> {
        if exprs.is_empty() {
            return Err(CompileError::EmptyProgram);
        }

        for (i, expr) in exprs.iter().enumerate() {
            self.compile_expr(expr)?;
            if i + 1 < exprs.len() {
                self.emit_op(Op::Pop);
            }
        }
        self.emit_op(Op::Halt);

        self.emit_pending()?;
        self.patch_fixups()?;

        Ok(Program {
            code: core::mem::take(&mut self.code),
            strings: core::mem::take(&mut self.strings.table),
            symbols: core::mem::take(&mut self.symbols),
        })
    }

    /// Restore the initial state: one empty global scope, fresh allocators,
    /// no pending functions, fix-ups or interned strings.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn compile_expr(&mut self, node: &Node) -> Result<(), CompileError> {
        match node {
            Node::Number(n) => {
                self.emit_op(Op::Push);
                self.emit(*n as u64);
                Ok(())
            }

            Node::Str(s) => {
                let addr = self.strings.intern(s.as_bytes());
                self.emit_op(Op::Push);
                self.emit(addr);
                Ok(())
            }

            Node::Symbol(name) => self.compile_symbol(name),

            Node::List(items) => self.compile_list(items),
        }
    }

    /// A bare symbol is a variable reference, innermost scope first.
    fn compile_symbol(&mut self, name: &str) -> Result<(), CompileError> {
        if let Some(binding) = self.lookup(name) {
            self.emit_load(binding);
            return Ok(());
        }
        if self.functions.contains_key(name) {
            return Err(CompileError::FunctionAsValue(name.to_owned()));
        }
        Err(CompileError::UnboundSymbol(name.to_owned()))
    }

    fn compile_list(&mut self, items: &[Node]) -> Result<(), CompileError> {
        let Some(head) = items.first() else {
            return Err(CompileError::EmptyList);
        };
        let Node::Symbol(op) = head else {
            return Err(CompileError::Malformed {
                form: "call",
                reason: "first element of a list must be a symbol",
            });
        };

        // Defined functions shadow the built-in forms.
        if self.functions.contains_key(op.as_str()) {
            return self.compile_call(op, items);
        }

        match op.as_str() {
            "define-var" => self.compile_define_var(items),
            "define-func" => self.compile_define_func(items),
            "set" => self.compile_set(items),
            "let" => self.compile_let(items),
            "do" => self.compile_do(items),
            "if" => self.compile_if(items),
            "while" => self.compile_while(items),
            "for" => self.compile_for(items),

            "peek" => self.compile_peek(items, "peek", Op::Load),
            "poke" => self.compile_poke(items, "poke", Op::Store),
            "peek-byte" => self.compile_peek(items, "peek-byte", Op::PeekByte),
            "poke-byte" => self.compile_poke(items, "poke-byte", Op::PokeByte),
            "peek32" => self.compile_peek(items, "peek32", Op::Peek32),
            "poke32" => self.compile_poke(items, "poke32", Op::Poke32),

            "print" | "print-int" => self.compile_print(items, "print", Op::Print),
            "print-string" => self.compile_print(items, "print-string", Op::PrintStr),

            "define-int" => self.compile_define_int(items),
            "function-address" => self.compile_function_address(items),
            "funcall" => self.compile_funcall(items),

            "+" => self.compile_fold(items, "+", Op::Add),
            "-" => self.compile_fold(items, "-", Op::Sub),
            "*" => self.compile_fold(items, "*", Op::Mul),
            "/" => self.compile_fold(items, "/", Op::Div),

            "%" => self.compile_binary(items, "%", Op::Mod),
            "=" => self.compile_binary(items, "=", Op::Eq),
            "<" => self.compile_binary(items, "<", Op::Lt),
            ">" => self.compile_binary(items, ">", Op::Gt),

            "bit-and" => self.compile_binary(items, "bit-and", Op::And),
            "bit-or" => self.compile_binary(items, "bit-or", Op::Or),
            "bit-xor" => self.compile_binary(items, "bit-xor", Op::Xor),
            "bit-shl" => self.compile_binary(items, "bit-shl", Op::Shl),
            "bit-shr" => self.compile_binary(items, "bit-shr", Op::Shr),
            "bit-ashr" => self.compile_binary(items, "bit-ashr", Op::Ashr),

            _ => Err(CompileError::UnknownOperator(op.clone())),
        }
    }

    /// Left-fold form: `(+ a b c)` lowers to `a b ADD c ADD`.
    fn compile_fold(
        &mut self,
        items: &[Node],
        form: &'static str,
        op: Op,
    ) -> Result<(), CompileError> {
        if items.len() < 3 {
            return Err(CompileError::Malformed {
                form,
                reason: "requires at least 2 arguments",
            });
        }
        self.compile_expr(&items[1])?;
        for item in &items[2..] {
            self.compile_expr(item)?;
            self.emit_op(op);
        }
        Ok(())
    }

    /// Strictly binary form.
    fn compile_binary(
        &mut self,
        items: &[Node],
        form: &'static str,
        op: Op,
    ) -> Result<(), CompileError> {
        if items.len() != 3 {
            return Err(CompileError::Malformed {
                form,
                reason: "requires exactly 2 arguments",
            });
        }
        self.compile_expr(&items[1])?;
        self.compile_expr(&items[2])?;
        self.emit_op(op);
        Ok(())
    }

    // --- Scopes and slots ---

    fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn lookup(&self, name: &str) -> Option<Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(name).copied())
    }

    /// Bind a fresh slot in the current scope: a globals word at toplevel,
    /// a frame slot inside a function body.
    fn define_slot(&mut self, name: &str) -> Result<Binding, CompileError> {
        // The global scope always exists
        let Some(scope) = self.scopes.last_mut() else {
            return Err(CompileError::UnboundSymbol(name.to_owned()));
        };
        if scope.bindings.contains_key(name) {
            return Err(CompileError::Redefinition(name.to_owned()));
        }

        let binding = if self.in_function {
            let slot = self.frame_next;
            self.frame_next += 1;
            Binding::Frame(slot)
        } else {
            let addr = self.next_global;
            self.next_global += 1;
            self.symbols.define_variable(name, addr);
            Binding::Global(addr)
        };

        scope.bindings.insert(name.to_owned(), binding);
        Ok(binding)
    }

    // --- Emission helpers ---

    fn emit(&mut self, word: u64) {
        self.code.push(word);
    }

    fn emit_op(&mut self, op: Op) {
        self.code.push(op.into());
    }

    /// Current emission offset.
    fn here(&self) -> usize {
        self.code.len()
    }

    /// Emit the value of a binding onto the stack.
    fn emit_load(&mut self, binding: Binding) {
        match binding {
            Binding::Global(addr) => {
                self.emit_op(Op::Push);
                self.emit(addr);
                self.emit_op(Op::Load);
            }
            Binding::Frame(slot) => {
                self.emit_op(Op::Push);
                self.emit(slot);
                self.emit_op(Op::BpLoad);
            }
        }
    }

    /// Emit a store of the stack top into a binding; consumes the value.
    fn emit_store(&mut self, binding: Binding) {
        match binding {
            Binding::Global(addr) => {
                self.emit_op(Op::Push);
                self.emit(addr);
                self.emit_op(Op::Store);
            }
            Binding::Frame(slot) => {
                self.emit_op(Op::Push);
                self.emit(slot);
                self.emit_op(Op::BpStore);
            }
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
