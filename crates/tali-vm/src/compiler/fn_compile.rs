// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Function definition, calls, interrupt handlers and address patch-up.
//!
//! `define-func` and `define-int` only queue their bodies; the code is
//! emitted after the main expression's HALT, one body after another in
//! insertion order. Call sites and `function-address` references record
//! fix-ups that are patched once every body address is known.

use crate::bytecode::Op;
use crate::reader::Node;

use super::{Binding, CompileError, Compiler, Fixup};

/// A queued body awaiting emission after the toplevel HALT.
#[derive(Debug, Clone)]
pub(crate) enum PendingBody {
    /// A named function.
    Function {
        /// The function's name.
        name: String,
        /// Parameter names, left to right.
        params: Vec<String>,
        /// The single body expression.
        body: Node,
    },
    /// An interrupt handler block, ending in IRET instead of RET.
    Handler {
        /// Internal patch label; handlers are anonymous.
        label: String,
        /// The handler body expression.
        body: Node,
    },
}

impl Compiler {
    /// `(define-func (name params...) body)` - queue a function body.
    ///
    /// The form's value is 0.
    pub(super) fn compile_define_func(&mut self, items: &[Node]) -> Result<(), CompileError> {
        if items.len() != 3 {
            return Err(CompileError::Malformed {
                form: "define-func",
                reason: "requires (name params...) and one body expression",
            });
        }
        let Node::List(signature) = &items[1] else {
            return Err(CompileError::Malformed {
                form: "define-func",
                reason: "first argument must be (name params...)",
            });
        };
        let Some((Node::Symbol(name), param_nodes)) = signature.split_first() else {
            return Err(CompileError::Malformed {
                form: "define-func",
                reason: "function name must be a symbol",
            });
        };

        let mut params = Vec::with_capacity(param_nodes.len());
        for param in param_nodes {
            let Node::Symbol(param) = param else {
                return Err(CompileError::Malformed {
                    form: "define-func",
                    reason: "parameters must be symbols",
                });
            };
            params.push(param.clone());
        }

        if self.functions.contains_key(name.as_str()) {
            return Err(CompileError::Redefinition(name.clone()));
        }
        self.functions.insert(name.clone(), params.len());
        self.symbols.define_function(name, 0, params.clone());
        self.pending.push(PendingBody::Function {
            name: name.clone(),
            params,
            body: items[2].clone(),
        });

        self.emit_op(Op::Push);
        self.emit(0);
        Ok(())
    }

    /// `(define-int sig handler-body)` - queue a handler block and emit its
    /// registration in place.
    ///
    /// The form's value is 0.
    pub(super) fn compile_define_int(&mut self, items: &[Node]) -> Result<(), CompileError> {
        if items.len() != 3 {
            return Err(CompileError::Malformed {
                form: "define-int",
                reason: "requires a signal number and a handler body",
            });
        }
        let Node::Number(signal) = items[1] else {
            return Err(CompileError::Malformed {
                form: "define-int",
                reason: "signal number must be a literal integer",
            });
        };
        if !(1..=31).contains(&signal) {
            return Err(CompileError::SignalOutOfRange(signal));
        }

        let label = format!("interrupt-{signal}-{}", self.pending.len());
        self.pending.push(PendingBody::Handler {
            label: label.clone(),
            body: items[2].clone(),
        });

        self.emit_op(Op::Push);
        self.emit(signal as u64);
        self.emit_op(Op::Push);
        let at = self.here();
        self.emit(0);
        self.fixups.push(Fixup { at, name: label });
        self.emit_op(Op::SignalReg);

        self.emit_op(Op::Push);
        self.emit(0);
        Ok(())
    }

    /// `(name args...)` - call a defined function.
    pub(super) fn compile_call(&mut self, name: &str, items: &[Node]) -> Result<(), CompileError> {
        let arity = self.functions[name];
        let args = &items[1..];
        if args.len() != arity {
            return Err(CompileError::ArityMismatch {
                name: name.to_owned(),
                expected: arity,
                got: args.len(),
            });
        }

        for arg in args {
            self.compile_expr(arg)?;
        }

        self.emit_op(Op::Call);
        let at = self.here();
        self.emit(0);
        self.fixups.push(Fixup {
            at,
            name: name.to_owned(),
        });
        self.emit(args.len() as u64);
        Ok(())
    }

    /// `(function-address name)` - push a function's code address.
    pub(super) fn compile_function_address(
        &mut self,
        items: &[Node],
    ) -> Result<(), CompileError> {
        let [_, Node::Symbol(name)] = items else {
            return Err(CompileError::Malformed {
                form: "function-address",
                reason: "requires a function name",
            });
        };
        if !self.functions.contains_key(name.as_str()) {
            return Err(CompileError::UndefinedFunction(name.clone()));
        }

        self.emit_op(Op::Push);
        let at = self.here();
        self.emit(0);
        self.fixups.push(Fixup {
            at,
            name: name.clone(),
        });
        Ok(())
    }

    /// `(funcall addr args...)` - call through a first-class function
    /// pointer: arguments first, then the target, then the indirect call.
    pub(super) fn compile_funcall(&mut self, items: &[Node]) -> Result<(), CompileError> {
        if items.len() < 2 {
            return Err(CompileError::Malformed {
                form: "funcall",
                reason: "requires an address expression",
            });
        }
        let args = &items[2..];
        for arg in args {
            self.compile_expr(arg)?;
        }
        self.compile_expr(&items[1])?;

        self.emit_op(Op::CallInd);
        self.emit(args.len() as u64);
        Ok(())
    }

    /// Emit every queued body. Bodies may queue further definitions; the
    /// loop drains whatever insertion order produced.
    pub(super) fn emit_pending(&mut self) -> Result<(), CompileError> {
        let mut next = 0;
        while next < self.pending.len() {
            let item = self.pending[next].clone();
            match item {
                PendingBody::Function { name, params, body } => {
                    self.emit_function(&name, &params, &body)?;
                }
                PendingBody::Handler { label, body } => {
                    self.emit_handler(&label, &body)?;
                }
            }
            next += 1;
        }
        Ok(())
    }

    /// Emit one function body.
    ///
    /// Frame layout: `ENTER k` reserves `k` slots (parameters, then
    /// temporaries), the prologue copies the `n` incoming arguments into
    /// slots `0..n`, the body leaves one result, `LEAVE k` / `RET n` unwind.
    fn emit_function(
        &mut self,
        name: &str,
        params: &[String],
        body: &Node,
    ) -> Result<(), CompileError> {
        let address = self.here() as u64;
        self.resolved.insert(name.to_owned(), address);
        self.symbols.define_function(name, address, params.to_vec());

        self.push_scope();
        self.in_function = true;
        self.frame_next = params.len() as u64;

        for (i, param) in params.iter().enumerate() {
            // The scope always has a top level here
            let Some(scope) = self.scopes.last_mut() else {
                return Err(CompileError::UnboundSymbol(param.clone()));
            };
            if scope
                .bindings
                .insert(param.clone(), Binding::Frame(i as u64))
                .is_some()
            {
                return Err(CompileError::Redefinition(param.clone()));
            }
        }

        self.emit_op(Op::Enter);
        let slots_ref = self.here();
        self.emit(0);

        // Prologue: copy argument i (at wrapping frame index i - n - 2,
        // above the saved BP) into frame slot i.
        let n = params.len() as u64;
        for i in 0..n {
            self.emit_op(Op::Push);
            self.emit(i.wrapping_sub(n).wrapping_sub(2));
            self.emit_op(Op::BpLoad);
            self.emit_op(Op::Push);
            self.emit(i);
            self.emit_op(Op::BpStore);
        }

        self.compile_expr(body)?;

        let slots = self.frame_next;
        self.code[slots_ref] = slots;
        self.emit_op(Op::Leave);
        self.emit(slots);
        self.emit_op(Op::Ret);
        self.emit(n);

        self.pop_scope();
        self.in_function = false;
        self.frame_next = 0;
        Ok(())
    }

    /// Emit one interrupt handler block: the body runs on the interrupted
    /// program's stack, its value is discarded, and IRET returns.
    fn emit_handler(&mut self, label: &str, body: &Node) -> Result<(), CompileError> {
        let address = self.here() as u64;
        self.resolved.insert(label.to_owned(), address);

        self.push_scope();
        self.compile_expr(body)?;
        self.pop_scope();

        self.emit_op(Op::Pop);
        self.emit_op(Op::Iret);
        Ok(())
    }

    /// Patch every recorded call site and address reference.
    pub(super) fn patch_fixups(&mut self) -> Result<(), CompileError> {
        for fixup in &self.fixups {
            let Some(address) = self.resolved.get(&fixup.name) else {
                return Err(CompileError::UndefinedFunction(fixup.name.clone()));
            };
            self.code[fixup.at] = *address;
        }
        self.fixups.clear();
        Ok(())
    }
}
