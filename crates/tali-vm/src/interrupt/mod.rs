// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Process-wide signal latch.
//!
//! OS signals can arrive on any thread at any time; the only thing the
//! handler does is bump two atomic counters. The engine polls the latch
//! between instructions and turns pending counts into VM interrupts, so
//! handler bytecode always runs serialized with normal execution.
//!
//! The latch is a process-global. Multiple engines in one process share the
//! pending counts and should not run concurrently without external
//! coordination.

#[cfg(test)]
mod interrupt_test;

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use nix::errno::Errno;
use nix::libc::c_int;
use nix::sys::signal::{
    SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal, sigaction, sigprocmask,
};

/// Lowest latchable signal number.
pub const SIGNAL_MIN: i32 = 1;

/// Highest latchable signal number.
pub const SIGNAL_MAX: i32 = 31;

/// Total pending events across all signals.
static EVENTS: AtomicU64 = AtomicU64::new(0);

/// Pending count per signal, indexed by `signal - 1`.
static COUNTS: [AtomicU32; 31] = [const { AtomicU32::new(0) }; 31];

/// Error raised by the latch API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchError {
    /// Signal number outside 1..=31.
    BadSignal(i32),
    /// The OS rejected a handler registration.
    Os(Errno),
}

impl core::fmt::Display for LatchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BadSignal(sig) => write!(f, "signal {sig} is outside 1..=31"),
            Self::Os(errno) => write!(f, "signal registration failed: {errno}"),
        }
    }
}

impl std::error::Error for LatchError {}

impl From<Errno> for LatchError {
    fn from(errno: Errno) -> Self {
        Self::Os(errno)
    }
}

/// The OS signal handler. Async-signal-safe: two atomic increments, nothing
/// else.
extern "C" fn latch_signal(signal: c_int) {
    if !(SIGNAL_MIN..=SIGNAL_MAX).contains(&signal) {
        return;
    }
    EVENTS.fetch_add(1, Ordering::Release);
    COUNTS[(signal - 1) as usize].fetch_add(1, Ordering::Release);
}

/// Install the latch handler for every catchable signal in 1..=31.
///
/// `SIGKILL` and `SIGSTOP` cannot be caught and are skipped. Installing is
/// idempotent.
pub fn install() -> Result<(), LatchError> {
    let action = SigAction::new(
        SigHandler::Handler(latch_signal),
        SaFlags::empty(),
        SigSet::all(),
    );
    for_each_catchable(|signal| {
        // SAFETY: latch_signal only touches atomics and is async-signal-safe.
        unsafe { sigaction(signal, &action) }.map(|_| ())
    })
}

/// Restore the default disposition for every signal the latch claimed.
pub fn uninstall() -> Result<(), LatchError> {
    let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for_each_catchable(|signal| {
        // SAFETY: SIG_DFL installs no handler code at all.
        unsafe { sigaction(signal, &action) }.map(|_| ())
    })
}

fn for_each_catchable(
    mut register: impl FnMut(Signal) -> Result<(), Errno>,
) -> Result<(), LatchError> {
    for number in SIGNAL_MIN..=SIGNAL_MAX {
        let Ok(signal) = Signal::try_from(number) else {
            continue;
        };
        if matches!(signal, Signal::SIGKILL | Signal::SIGSTOP) {
            continue;
        }
        register(signal)?;
    }
    Ok(())
}

/// Returns true if any signal has been latched and not yet consumed.
#[must_use]
pub fn has_pending() -> bool {
    EVENTS.load(Ordering::Acquire) > 0
}

/// Pending count for one signal.
pub fn count(signal: i32) -> Result<u32, LatchError> {
    let index = check(signal)?;
    Ok(COUNTS[index].load(Ordering::Acquire))
}

/// Consume one pending unit of `signal`.
///
/// A compare-and-swap loop; if the count is already zero the call is a no-op.
pub fn consume(signal: i32) -> Result<(), LatchError> {
    let index = check(signal)?;
    let mut current = COUNTS[index].load(Ordering::Acquire);
    while current > 0 {
        match COUNTS[index].compare_exchange_weak(
            current,
            current - 1,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                EVENTS.fetch_sub(1, Ordering::Release);
                break;
            }
            Err(observed) => current = observed,
        }
    }
    Ok(())
}

/// Reset every counter to zero.
///
/// Catchable signals are blocked for the duration so an arrival during the
/// reset is queued by the kernel instead of being half-counted.
pub fn clear() -> Result<(), LatchError> {
    let mut block = SigSet::all();
    block.remove(Signal::SIGKILL);
    block.remove(Signal::SIGSTOP);

    let mut previous = SigSet::empty();
    sigprocmask(SigmaskHow::SIG_BLOCK, Some(&block), Some(&mut previous))?;

    for counter in &COUNTS {
        counter.store(0, Ordering::Release);
    }
    EVENTS.store(0, Ordering::Release);

    sigprocmask(SigmaskHow::SIG_SETMASK, Some(&previous), None)?;
    Ok(())
}

fn check(signal: i32) -> Result<usize, LatchError> {
    if !(SIGNAL_MIN..=SIGNAL_MAX).contains(&signal) {
        return Err(LatchError::BadSignal(signal));
    }
    Ok((signal - 1) as usize)
}

/// Serializes tests that raise signals or clear the latch; the latch is
/// process-global and the test harness is multi-threaded.
#[cfg(test)]
pub(crate) static SIGNAL_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
