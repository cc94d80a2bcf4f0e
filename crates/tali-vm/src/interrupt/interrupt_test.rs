// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Tests for the signal latch.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use nix::sys::signal::{Signal, raise};

use super::{LatchError, SIGNAL_TEST_LOCK, clear, consume, count, has_pending, install};

fn lock() -> std::sync::MutexGuard<'static, ()> {
    SIGNAL_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[test]
fn raised_signal_is_latched_and_consumed() {
    let _guard = lock();
    install().unwrap();
    clear().unwrap();

    let sig = Signal::SIGUSR2 as i32;
    raise(Signal::SIGUSR2).unwrap();

    assert!(has_pending());
    assert_eq!(count(sig).unwrap(), 1);

    consume(sig).unwrap();
    assert_eq!(count(sig).unwrap(), 0);
    assert!(!has_pending());
}

#[test]
fn multiple_raises_accumulate() {
    let _guard = lock();
    install().unwrap();
    clear().unwrap();

    let sig = Signal::SIGUSR2 as i32;
    raise(Signal::SIGUSR2).unwrap();
    raise(Signal::SIGUSR2).unwrap();
    raise(Signal::SIGUSR2).unwrap();
    assert_eq!(count(sig).unwrap(), 3);

    consume(sig).unwrap();
    assert_eq!(count(sig).unwrap(), 2);

    clear().unwrap();
    assert_eq!(count(sig).unwrap(), 0);
}

#[test]
fn consume_at_zero_is_a_no_op() {
    let _guard = lock();
    install().unwrap();
    clear().unwrap();

    let sig = Signal::SIGHUP as i32;
    consume(sig).unwrap();
    assert_eq!(count(sig).unwrap(), 0);
    assert!(!has_pending());
}

#[test]
fn distinct_signals_have_distinct_counters() {
    let _guard = lock();
    install().unwrap();
    clear().unwrap();

    raise(Signal::SIGHUP).unwrap();
    raise(Signal::SIGUSR2).unwrap();

    assert_eq!(count(Signal::SIGHUP as i32).unwrap(), 1);
    assert_eq!(count(Signal::SIGUSR2 as i32).unwrap(), 1);

    consume(Signal::SIGHUP as i32).unwrap();
    assert_eq!(count(Signal::SIGHUP as i32).unwrap(), 0);
    assert_eq!(count(Signal::SIGUSR2 as i32).unwrap(), 1);

    clear().unwrap();
}

#[test]
fn out_of_range_signals_are_rejected() {
    assert_eq!(count(0), Err(LatchError::BadSignal(0)));
    assert_eq!(count(32), Err(LatchError::BadSignal(32)));
    assert_eq!(consume(-1), Err(LatchError::BadSignal(-1)));
}
