// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! The `tali-vm` binary: run a source file or start the REPL.
//!
//! ```text
//! tali-vm [--dump] [--limit N] [file]
//! ```
//!
//! With a file, the program is compiled and executed; the terminal top of
//! stack is printed. Without one, an interactive REPL starts. `--dump`
//! prints the bytecode listing before execution, `--limit N` caps the run
//! at N instructions.

use std::process::ExitCode;

use tali_vm::compiler::{Compiler, disassemble};
use tali_vm::reader::parse_all;
use tali_vm::vm::RunOutcome;
use tali_vm::{Engine, interrupt, repl};

struct Options {
    dump: bool,
    limit: Option<u64>,
    file: Option<String>,
}

fn usage() -> ExitCode {
    eprintln!("usage: tali-vm [--dump] [--limit N] [file]");
    ExitCode::FAILURE
}

fn parse_args() -> Result<Options, ExitCode> {
    let mut options = Options {
        dump: false,
        limit: None,
        file: None,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump" => options.dump = true,
            "--limit" => {
                let Some(value) = args.next() else {
                    return Err(usage());
                };
                let Ok(limit) = value.parse::<u64>() else {
                    return Err(usage());
                };
                options.limit = Some(limit);
            }
            "--help" | "-h" => return Err(usage()),
            _ if options.file.is_none() => options.file = Some(arg),
            _ => return Err(usage()),
        }
    }

    Ok(options)
}

fn run_file(path: &str, options: &Options) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("tali-vm: {path}: {error}");
            return ExitCode::FAILURE;
        }
    };

    let nodes = match parse_all(&source) {
        Ok(nodes) => nodes,
        Err(error) => {
            eprintln!("tali-vm: parse error: {error}");
            return ExitCode::FAILURE;
        }
    };
    if nodes.is_empty() {
        eprintln!("tali-vm: {path}: no expressions");
        return ExitCode::FAILURE;
    }

    let program = match Compiler::new().compile_program(&nodes) {
        Ok(program) => program,
        Err(error) => {
            eprintln!("tali-vm: compile error: {error}");
            return ExitCode::FAILURE;
        }
    };

    if options.dump {
        print!("{}", disassemble::disassemble(&program.code));
    }

    let mut engine = match Engine::new() {
        Ok(engine) => engine,
        Err(error) => {
            eprintln!("tali-vm: {error}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(error) = engine.load(&program) {
        eprintln!("tali-vm: {error}");
        return ExitCode::FAILURE;
    }

    let outcome = match options.limit {
        Some(limit) => engine.run_budget(limit),
        None => engine.run(),
    };

    match outcome {
        Ok(RunOutcome::Halted) => {
            if let Ok(top) = engine.top() {
                println!("=> {top}");
            }
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::HitLimit) => {
            eprintln!(
                "tali-vm: instruction limit reached after {} steps",
                engine.steps()
            );
            ExitCode::FAILURE
        }
        Err(fault) => {
            eprintln!(
                "tali-vm: execution fault: {fault} (ip={:#x} sp={:#x})",
                engine.ip(),
                engine.sp()
            );
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let options = match parse_args() {
        Ok(options) => options,
        Err(code) => return code,
    };

    if let Err(error) = interrupt::install() {
        eprintln!("tali-vm: {error}");
        return ExitCode::FAILURE;
    }

    let code = match &options.file {
        Some(path) => run_file(path, &options),
        None => {
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            match repl::run(stdin.lock(), &mut stdout) {
                Ok(()) => ExitCode::SUCCESS,
                Err(error) => {
                    eprintln!("tali-vm: {error}");
                    ExitCode::FAILURE
                }
            }
        }
    };

    let _ = interrupt::uninstall();
    code
}
