// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Output sink for the PRINT instructions.
//!
//! The engine never talks to stdout directly; it goes through this trait so
//! tests can capture program output.

use std::io::Write;

/// Where `PRINT` and `PRINT_STR` send their output.
pub trait Console {
    /// Print the decimal representation of a word, followed by a newline.
    fn print_word(&mut self, value: u64);

    /// Print raw string bytes, followed by a newline.
    fn print_bytes(&mut self, bytes: &[u8]);
}

/// Console writing to the process stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn print_word(&mut self, value: u64) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{value}");
    }

    fn print_bytes(&mut self, bytes: &[u8]) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(bytes);
        let _ = out.write_all(b"\n");
    }
}

/// Console capturing output lines in memory, for tests.
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    /// Captured lines, one per print.
    pub lines: Vec<String>,
}

impl Console for BufferConsole {
    fn print_word(&mut self, value: u64) {
        self.lines.push(value.to_string());
    }

    fn print_bytes(&mut self, bytes: &[u8]) {
        self.lines.push(String::from_utf8_lossy(bytes).into_owned());
    }
}
