// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Lowerings for the binding, control-flow, memory and print forms.

use crate::bytecode::Op;
use crate::reader::Node;

use super::{CompileError, Compiler};

impl Compiler {
    /// `(define-var name expr)` - bind a fresh slot and initialize it.
    ///
    /// The value is duplicated so the form itself evaluates to it.
    pub(super) fn compile_define_var(&mut self, items: &[Node]) -> Result<(), CompileError> {
        if items.len() != 3 {
            return Err(CompileError::Malformed {
                form: "define-var",
                reason: "requires a name and a value",
            });
        }
        let Node::Symbol(name) = &items[1] else {
            return Err(CompileError::Malformed {
                form: "define-var",
                reason: "first argument must be a symbol",
            });
        };

        let binding = self.define_slot(name)?;
        self.compile_expr(&items[2])?;
        self.emit_op(Op::Dup);
        self.emit_store(binding);
        Ok(())
    }

    /// `(set name expr)` - assign to an existing binding.
    pub(super) fn compile_set(&mut self, items: &[Node]) -> Result<(), CompileError> {
        if items.len() != 3 {
            return Err(CompileError::Malformed {
                form: "set",
                reason: "requires a name and a value",
            });
        }
        let Node::Symbol(name) = &items[1] else {
            return Err(CompileError::Malformed {
                form: "set",
                reason: "first argument must be a symbol",
            });
        };
        let Some(binding) = self.lookup(name) else {
            return Err(CompileError::UnboundSymbol(name.clone()));
        };

        self.compile_expr(&items[2])?;
        self.emit_op(Op::Dup);
        self.emit_store(binding);
        Ok(())
    }

    /// `(let ((n1 e1) ...) body...)` - scoped bindings.
    pub(super) fn compile_let(&mut self, items: &[Node]) -> Result<(), CompileError> {
        if items.len() < 3 {
            return Err(CompileError::Malformed {
                form: "let",
                reason: "requires bindings and a body",
            });
        }
        let Node::List(bindings) = &items[1] else {
            return Err(CompileError::Malformed {
                form: "let",
                reason: "first argument must be a binding list",
            });
        };

        self.push_scope();
        let result = self.compile_let_inner(bindings, &items[2..]);
        self.pop_scope();
        result
    }

    fn compile_let_inner(
        &mut self,
        bindings: &[Node],
        body: &[Node],
    ) -> Result<(), CompileError> {
        for binding in bindings {
            let Node::List(pair) = binding else {
                return Err(CompileError::Malformed {
                    form: "let",
                    reason: "each binding must be a (name value) list",
                });
            };
            let [Node::Symbol(name), value] = pair.as_slice() else {
                return Err(CompileError::Malformed {
                    form: "let",
                    reason: "each binding must be a (name value) list",
                });
            };

            self.compile_expr(value)?;
            let slot = self.define_slot(name)?;
            self.emit_store(slot);
        }

        for (i, expr) in body.iter().enumerate() {
            self.compile_expr(expr)?;
            if i + 1 < body.len() {
                self.emit_op(Op::Pop);
            }
        }
        Ok(())
    }

    /// `(do e1 ... en)` - evaluate left to right, keep the last result.
    pub(super) fn compile_do(&mut self, items: &[Node]) -> Result<(), CompileError> {
        if items.len() < 2 {
            return Err(CompileError::Malformed {
                form: "do",
                reason: "requires at least 1 expression",
            });
        }
        for (i, expr) in items[1..].iter().enumerate() {
            self.compile_expr(expr)?;
            if i + 2 < items.len() {
                self.emit_op(Op::Pop);
            }
        }
        Ok(())
    }

    /// `(if c t e)` - branch on zero.
    pub(super) fn compile_if(&mut self, items: &[Node]) -> Result<(), CompileError> {
        if items.len() != 4 {
            return Err(CompileError::Malformed {
                form: "if",
                reason: "requires condition, then and else",
            });
        }

        self.compile_expr(&items[1])?;

        self.emit_op(Op::Jz);
        let else_ref = self.here();
        self.emit(0);

        self.compile_expr(&items[2])?;
        self.emit_op(Op::Jmp);
        let end_ref = self.here();
        self.emit(0);

        self.code[else_ref] = self.here() as u64;
        self.compile_expr(&items[3])?;

        self.code[end_ref] = self.here() as u64;
        Ok(())
    }

    /// `(while c body...)` - loop while the condition is non-zero.
    ///
    /// The form's value is 0.
    pub(super) fn compile_while(&mut self, items: &[Node]) -> Result<(), CompileError> {
        if items.len() < 3 {
            return Err(CompileError::Malformed {
                form: "while",
                reason: "requires a condition and a body",
            });
        }

        let loop_start = self.here() as u64;
        self.compile_expr(&items[1])?;

        self.emit_op(Op::Jz);
        let end_ref = self.here();
        self.emit(0);

        for expr in &items[2..] {
            self.compile_expr(expr)?;
            self.emit_op(Op::Pop);
        }

        self.emit_op(Op::Jmp);
        self.emit(loop_start);

        self.code[end_ref] = self.here() as u64;
        self.emit_op(Op::Push);
        self.emit(0);
        Ok(())
    }

    /// `(for (i start end) body...)` - iterate `i` from `start` to `end - 1`.
    ///
    /// The form's value is 0.
    pub(super) fn compile_for(&mut self, items: &[Node]) -> Result<(), CompileError> {
        if items.len() < 3 {
            return Err(CompileError::Malformed {
                form: "for",
                reason: "requires (var start end) and a body",
            });
        }
        let Node::List(spec) = &items[1] else {
            return Err(CompileError::Malformed {
                form: "for",
                reason: "first argument must be (var start end)",
            });
        };
        let [Node::Symbol(var), start, end] = spec.as_slice() else {
            return Err(CompileError::Malformed {
                form: "for",
                reason: "loop spec must be (var start end)",
            });
        };

        self.push_scope();
        let result = self.compile_for_inner(var, start, end, &items[2..]);
        self.pop_scope();
        result
    }

    fn compile_for_inner(
        &mut self,
        var: &str,
        start: &Node,
        end: &Node,
        body: &[Node],
    ) -> Result<(), CompileError> {
        self.compile_expr(start)?;
        let var_slot = self.define_slot(var)?;
        self.emit_store(var_slot);

        self.compile_expr(end)?;
        let end_slot = self.define_slot("__for_end__")?;
        self.emit_store(end_slot);

        let loop_start = self.here() as u64;

        // var < end, or leave the loop
        self.emit_load(var_slot);
        self.emit_load(end_slot);
        self.emit_op(Op::Lt);
        self.emit_op(Op::Jz);
        let end_ref = self.here();
        self.emit(0);

        for expr in body {
            self.compile_expr(expr)?;
            self.emit_op(Op::Pop);
        }

        // var = var + 1
        self.emit_load(var_slot);
        self.emit_op(Op::Push);
        self.emit(1);
        self.emit_op(Op::Add);
        self.emit_store(var_slot);

        self.emit_op(Op::Jmp);
        self.emit(loop_start);

        self.code[end_ref] = self.here() as u64;
        self.emit_op(Op::Push);
        self.emit(0);
        Ok(())
    }

    /// `(peek addr)` family - read memory at an address expression.
    pub(super) fn compile_peek(
        &mut self,
        items: &[Node],
        form: &'static str,
        op: Op,
    ) -> Result<(), CompileError> {
        if items.len() != 2 {
            return Err(CompileError::Malformed {
                form,
                reason: "requires exactly 1 argument",
            });
        }
        self.compile_expr(&items[1])?;
        self.emit_op(op);
        Ok(())
    }

    /// `(poke addr value)` family - write memory, leaving the stored value
    /// on the stack.
    pub(super) fn compile_poke(
        &mut self,
        items: &[Node],
        form: &'static str,
        op: Op,
    ) -> Result<(), CompileError> {
        if items.len() != 3 {
            return Err(CompileError::Malformed {
                form,
                reason: "requires an address and a value",
            });
        }
        // value, DUP, address: the store consumes one copy and the other is
        // the form's value.
        self.compile_expr(&items[2])?;
        self.emit_op(Op::Dup);
        self.compile_expr(&items[1])?;
        self.emit_op(op);
        Ok(())
    }

    /// `(print x)` / `(print-string s)` - print and evaluate to the operand.
    pub(super) fn compile_print(
        &mut self,
        items: &[Node],
        form: &'static str,
        op: Op,
    ) -> Result<(), CompileError> {
        if items.len() != 2 {
            return Err(CompileError::Malformed {
                form,
                reason: "requires exactly 1 argument",
            });
        }
        self.compile_expr(&items[1])?;
        self.emit_op(Op::Dup);
        self.emit_op(op);
        Ok(())
    }
}
