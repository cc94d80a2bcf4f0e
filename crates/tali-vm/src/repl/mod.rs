// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Line-oriented REPL.
//!
//! Each line is parsed, compiled and run on a fresh engine; the terminal top
//! of stack is echoed back. Errors are reported and the session continues.


use std::io::{BufRead, Write};

use crate::arena::ArenaError;
use crate::compiler::{CompileError, Compiler};
use crate::reader::{ParseError, parse_all};
use crate::vm::{Engine, Fault};

/// Everything that can go wrong evaluating one source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The reader rejected the source.
    Parse(ParseError),
    /// The compiler rejected the tree.
    Compile(CompileError),
    /// The engine faulted.
    Fault(Fault),
    /// The arena could not be created or loaded.
    Arena(ArenaError),
    /// The source contained no expressions.
    Empty,
}

impl core::fmt::Display for EvalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::Compile(e) => write!(f, "compile error: {e}"),
            Self::Fault(e) => write!(f, "execution fault: {e}"),
            Self::Arena(e) => write!(f, "arena error: {e}"),
            Self::Empty => write!(f, "nothing to evaluate"),
        }
    }
}

impl std::error::Error for EvalError {}

impl From<ParseError> for EvalError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<CompileError> for EvalError {
    fn from(e: CompileError) -> Self {
        Self::Compile(e)
    }
}

impl From<Fault> for EvalError {
    fn from(e: Fault) -> Self {
        Self::Fault(e)
    }
}

impl From<ArenaError> for EvalError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

/// Parse, compile and run one source string on a fresh engine.
///
/// Returns the terminal top of stack. Program `print` output goes to the
/// process stdout.
pub fn eval_source(source: &str) -> Result<u64, EvalError> {
    let nodes = parse_all(source)?;
    if nodes.is_empty() {
        return Err(EvalError::Empty);
    }

    let program = Compiler::new().compile_program(&nodes)?;
    let mut engine = Engine::new()?;
    engine.load(&program)?;
    engine.run()?;
    Ok(engine.top()?)
}

/// Run the interactive loop until EOF or `quit`.
pub fn run<R: BufRead, W: Write>(input: R, output: &mut W) -> std::io::Result<()> {
    writeln!(output, "Tali VM {} - type 'quit' to exit", crate::VERSION)?;

    let mut lines = input.lines();
    loop {
        write!(output, "> ")?;
        output.flush()?;

        let Some(line) = lines.next() else {
            writeln!(output)?;
            return Ok(());
        };
        let line = line?;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            return Ok(());
        }

        match eval_source(line) {
            Ok(value) => writeln!(output, "=> {value}")?,
            Err(error) => writeln!(output, "{error}")?,
        }
    }
}
