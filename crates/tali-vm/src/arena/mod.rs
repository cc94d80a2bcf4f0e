// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! The memory arena: a single flat 64-bit-word address space.
//!
//! One anonymous private mapping backs all four regions. The kernel pages it
//! in on first touch, so constructing an arena is cheap even though its
//! nominal size is 4 GiB.
//!
//! The arena is the sole owner of every word. The engine reads and writes
//! through the checked accessors; nothing hands out long-lived references
//! into the mapping.


pub mod layout;

use core::num::NonZeroUsize;
use core::ptr::NonNull;

use nix::errno::Errno;
use nix::libc::c_void;
use nix::sys::mman::{MapFlags, ProtFlags, mmap_anonymous, munmap};

use self::layout::{ARENA_WORDS, CODE_END, HEAP_START, STACK_BASE, WORD_BYTES, is_code};

/// Error raised by arena construction and access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    /// Address is outside the arena.
    OutOfBounds(u64),
    /// Write into the code region after program load.
    CodeWrite(u64),
    /// Program does not fit into the code region.
    ProgramTooLarge(usize),
    /// The backing mapping could not be created.
    MapFailed(Errno),
}

impl core::fmt::Display for ArenaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfBounds(addr) => write!(f, "address {addr:#x} is outside the arena"),
            Self::CodeWrite(addr) => write!(f, "write into code region at {addr:#x}"),
            Self::ProgramTooLarge(words) => {
                write!(f, "program of {words} words does not fit the code region")
            }
            Self::MapFailed(errno) => write!(f, "failed to map arena memory: {errno}"),
        }
    }
}

impl std::error::Error for ArenaError {}

/// Dirty extents of the writable regions, tracked for checkpointing.
///
/// Everything outside these spans (and the loaded code image) is still the
/// all-zero state the mapping started with, so a snapshot of the spans is a
/// snapshot of the full arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtySpans {
    /// Lowest and one-past-highest dirty globals word; `None` if untouched.
    pub globals: Option<(u64, u64)>,
    /// One past the highest dirty heap word; `HEAP_START` if untouched.
    pub heap_end: u64,
    /// Lowest dirty stack word; `STACK_BASE` if untouched.
    pub stack_low: u64,
}

impl DirtySpans {
    const fn clean() -> Self {
        Self {
            globals: None,
            heap_end: HEAP_START,
            stack_low: STACK_BASE,
        }
    }
}

/// A flat, demand-paged span of `ARENA_WORDS` 64-bit words.
pub struct Arena {
    base: NonNull<u64>,
    code_len: u64,
    dirty: DirtySpans,
}

impl Arena {
    /// Map a fresh, all-zero arena.
    pub fn new() -> Result<Self, ArenaError> {
        let bytes = (ARENA_WORDS * WORD_BYTES) as usize;
        // ARENA_WORDS is a non-zero constant
        let Some(len) = NonZeroUsize::new(bytes) else {
            return Err(ArenaError::MapFailed(Errno::EINVAL));
        };

        // SAFETY: anonymous mapping with no file descriptor involved.
        let mapping = unsafe {
            mmap_anonymous(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_PRIVATE,
            )
        }
        .map_err(ArenaError::MapFailed)?;

        Ok(Self {
            base: mapping.cast::<u64>(),
            code_len: 0,
            dirty: DirtySpans::clean(),
        })
    }

    /// Read the word at `addr`.
    pub fn read(&self, addr: u64) -> Result<u64, ArenaError> {
        if !layout::is_valid(addr) {
            return Err(ArenaError::OutOfBounds(addr));
        }
        // SAFETY: addr < ARENA_WORDS, so the offset stays inside the mapping.
        Ok(unsafe { self.base.as_ptr().add(addr as usize).read() })
    }

    /// Write the word at `addr`. The code region is read-only.
    pub fn write(&mut self, addr: u64, value: u64) -> Result<(), ArenaError> {
        if !layout::is_valid(addr) {
            return Err(ArenaError::OutOfBounds(addr));
        }
        if is_code(addr) {
            return Err(ArenaError::CodeWrite(addr));
        }
        self.mark_dirty(addr);
        // SAFETY: addr < ARENA_WORDS, so the offset stays inside the mapping.
        unsafe { self.base.as_ptr().add(addr as usize).write(value) };
        Ok(())
    }

    /// Read the byte at byte address `byte_addr` (little-endian within words).
    pub fn read_byte(&self, byte_addr: u64) -> Result<u8, ArenaError> {
        let word = self.read(byte_addr / WORD_BYTES)?;
        let shift = (byte_addr % WORD_BYTES) * 8;
        Ok((word >> shift) as u8)
    }

    /// Write the byte at byte address `byte_addr`, preserving its neighbours.
    pub fn write_byte(&mut self, byte_addr: u64, value: u8) -> Result<(), ArenaError> {
        let addr = byte_addr / WORD_BYTES;
        let shift = (byte_addr % WORD_BYTES) * 8;
        let word = self.read(addr)?;
        let cleared = word & !(0xFF << shift);
        self.write(addr, cleared | (u64::from(value) << shift))
    }

    /// Read the little-endian 32-bit value starting at byte address `byte_addr`.
    pub fn read_u32(&self, byte_addr: u64) -> Result<u32, ArenaError> {
        let mut value: u32 = 0;
        for i in 0..4 {
            let byte = self.read_byte(byte_addr + i)?;
            value |= u32::from(byte) << (i * 8);
        }
        Ok(value)
    }

    /// Write a little-endian 32-bit value starting at byte address `byte_addr`.
    pub fn write_u32(&mut self, byte_addr: u64, value: u32) -> Result<(), ArenaError> {
        for i in 0..4 {
            self.write_byte(byte_addr + i, (value >> (i * 8)) as u8)?;
        }
        Ok(())
    }

    /// Bulk-load a program image at word 0 and fix the code extent.
    ///
    /// Any previously loaded image is zeroed first, so reloading leaves no
    /// stale instructions behind.
    pub fn load_code(&mut self, code: &[u64]) -> Result<(), ArenaError> {
        if code.len() as u64 > CODE_END {
            return Err(ArenaError::ProgramTooLarge(code.len()));
        }
        self.zero_words(0, self.code_len);
        // SAFETY: code.len() <= CODE_END <= ARENA_WORDS.
        unsafe {
            core::ptr::copy_nonoverlapping(code.as_ptr(), self.base.as_ptr(), code.len());
        }
        self.code_len = code.len() as u64;
        Ok(())
    }

    /// Number of words in the loaded program image.
    #[must_use]
    pub const fn code_len(&self) -> u64 {
        self.code_len
    }

    /// Current dirty extents of the writable regions.
    #[must_use]
    pub const fn dirty(&self) -> DirtySpans {
        self.dirty
    }

    /// Copy `len` words starting at `start`, for snapshots.
    pub(crate) fn copy_words(&self, start: u64, len: u64) -> Vec<u64> {
        debug_assert!(start + len <= ARENA_WORDS);
        let mut out = vec![0u64; len as usize];
        // SAFETY: the span [start, start + len) lies inside the mapping.
        unsafe {
            core::ptr::copy_nonoverlapping(
                self.base.as_ptr().add(start as usize),
                out.as_mut_ptr(),
                len as usize,
            );
        }
        out
    }

    /// Write `words` starting at `start`, bypassing the code-region guard.
    ///
    /// Only checkpoint restore uses this; it re-creates a previously observed
    /// arena state, including the code image.
    pub(crate) fn restore_words(&mut self, start: u64, words: &[u64]) {
        debug_assert!(start + words.len() as u64 <= ARENA_WORDS);
        // SAFETY: the span [start, start + words.len()) lies inside the mapping.
        unsafe {
            core::ptr::copy_nonoverlapping(
                words.as_ptr(),
                self.base.as_ptr().add(start as usize),
                words.len(),
            );
        }
    }

    /// Zero `len` words starting at `start`.
    pub(crate) fn zero_words(&mut self, start: u64, len: u64) {
        debug_assert!(start + len <= ARENA_WORDS);
        // SAFETY: the span [start, start + len) lies inside the mapping.
        unsafe {
            core::ptr::write_bytes(
                self.base.as_ptr().add(start as usize),
                0,
                len as usize,
            );
        }
    }

    /// Zero every word written outside the code region and reset the dirty
    /// bookkeeping, returning the writable regions to their fresh state.
    pub(crate) fn clear_writable(&mut self) {
        if let Some((lo, hi)) = self.dirty.globals {
            self.zero_words(lo, hi - lo);
        }
        self.zero_words(HEAP_START, self.dirty.heap_end - HEAP_START);
        self.zero_words(self.dirty.stack_low, STACK_BASE - self.dirty.stack_low);
        self.dirty = DirtySpans::clean();
    }

    /// Overwrite the dirty bookkeeping, used after a checkpoint restore.
    pub(crate) fn set_state(&mut self, code_len: u64, dirty: DirtySpans) {
        self.code_len = code_len;
        self.dirty = dirty;
    }

    fn mark_dirty(&mut self, addr: u64) {
        if layout::is_globals(addr) {
            self.dirty.globals = Some(match self.dirty.globals {
                None => (addr, addr + 1),
                Some((lo, hi)) => (lo.min(addr), hi.max(addr + 1)),
            });
        } else if layout::is_heap(addr) {
            self.dirty.heap_end = self.dirty.heap_end.max(addr + 1);
        } else {
            self.dirty.stack_low = self.dirty.stack_low.min(addr);
        }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        let bytes = (ARENA_WORDS * WORD_BYTES) as usize;
        // SAFETY: base was returned by mmap_anonymous with exactly this length
        // and is unmapped exactly once.
        let _ = unsafe { munmap(self.base.cast::<c_void>(), bytes) };
    }
}

// SAFETY: the arena exclusively owns its mapping; nothing aliases it.
unsafe impl Send for Arena {}
