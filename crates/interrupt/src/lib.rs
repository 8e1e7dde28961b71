#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Ctrl-C arriving mid-write must never leave a destination file in a state
//! that is neither the old content nor the new one. This crate gives the
//! rest of the synchronizer two cooperating primitives for that:
//!
//! - [`Guard`] (and the [`delay_keyboard_interrupt`] convenience wrapper)
//!   brackets a critical section for readability and for debug assertions
//!   against nested staging regions, via [`Guard::is_masked`].
//! - [`checkpoint`] is the only place an interrupt actually takes effect: it
//!   returns [`Interrupted`], carrying whatever partial result the caller
//!   supplies, the moment `SIGINT` has been observed since the last check.
//!
//! # Design
//!
//! `SIGINT` delivery on Unix is asynchronous no matter what a handler does;
//! the only thing a handler can reliably do without invoking
//! async-signal-unsafe code is flip a flag. [`install`] does exactly that,
//! via `signal-hook`'s `flag` module. Masking a critical section therefore
//! does not block the OS from recording the signal — it works by simple
//! absence: code inside a [`Guard`] never calls [`checkpoint`], so the flag
//! sits pending until the next safe point between regions, at which point it
//! is delivered as an ordinary `Result::Err` instead of unwinding the stack.
//! This is the Rust analogue of masking `SIGINT` around a critical section
//! and re-raising the captured signal once the section completes.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::{Arc, OnceLock};

use std::sync::atomic::AtomicBool;

static FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

thread_local! {
    static MASK_DEPTH: Cell<u32> = const { Cell::new(0) };
}

fn flag() -> &'static Arc<AtomicBool> {
    FLAG.get_or_init(|| {
        let flag = Arc::new(AtomicBool::new(false));
        // Best-effort: if registration fails (platform without SIGINT, or a
        // handler slot already taken), the synchronizer simply never
        // observes an interrupt and runs to completion.
        let _ = signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag));
        flag
    })
}

/// Installs the process-wide `SIGINT` handler.
///
/// Idempotent, and safe to call from every entry point that might run
/// first: the CLI binary's `main`, library consumers embedding the
/// synchronizer, and test setup. [`Guard::enter`] and [`checkpoint`] call it
/// implicitly, so most code never needs to call it directly.
pub fn install() {
    let _ = flag();
}

/// True if `SIGINT` has been observed since the last [`reset_for_testing`]
/// (or process start, if that was never called).
#[must_use]
pub fn is_interrupted() -> bool {
    flag().load(Ordering::SeqCst)
}

/// Clears the interrupt flag.
///
/// Exists so test suites that exercise interrupted code paths (directly, or
/// via [`simulate_interrupt_for_testing`]) don't leak state into later
/// tests sharing the process.
pub fn reset_for_testing() {
    flag().store(false, Ordering::SeqCst);
}

/// Sets the interrupt flag without sending a real signal.
///
/// For tests that need to exercise an interrupted [`checkpoint`] without
/// racing a real `SIGINT` against the test process.
pub fn simulate_interrupt_for_testing() {
    install();
    flag().store(true, Ordering::SeqCst);
}

/// An RAII bracket around a critical section that must run to completion
/// once started.
///
/// Entering a `Guard` does not block `SIGINT` delivery (see the crate-level
/// docs); it exists so code can assert, via [`Guard::is_masked`], that it is
/// not about to open a second staging region while one is already live on
/// the current thread.
#[derive(Debug)]
#[must_use = "the critical section ends when the guard is dropped"]
pub struct Guard {
    _private: (),
}

impl Guard {
    /// Enters a critical section on the calling thread.
    pub fn enter() -> Self {
        install();
        MASK_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self { _private: () }
    }

    /// True if the calling thread is currently inside a [`Guard`].
    #[must_use]
    pub fn is_masked() -> bool {
        MASK_DEPTH.with(|depth| depth.get() > 0)
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        MASK_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Runs `f` inside a [`Guard`], returning its result.
///
/// Equivalent to entering a guard, calling `f`, and letting the guard drop
/// at the end of the block.
pub fn delay_keyboard_interrupt<T>(f: impl FnOnce() -> T) -> T {
    let _guard = Guard::enter();
    f()
}

/// An interrupt observed at a [`checkpoint`], carrying the partial result
/// the caller had in hand at that point.
///
/// Mirrors raising an exception that still carries a payload: callers
/// propagate this upward to a point where the partial result can be
/// reported or merged, rather than discarding the work already done.
#[derive(Debug)]
pub struct Interrupted<T> {
    /// The partial result in hand when the interrupt was observed.
    pub data: T,
}

impl<T> Interrupted<T> {
    /// Wraps `data` as an interrupted outcome.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T: fmt::Debug> fmt::Display for Interrupted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interrupted by SIGINT with partial result: {:?}", self.data)
    }
}

impl<T: fmt::Debug> std::error::Error for Interrupted<T> {}

/// Returns `Err` carrying the result of `data()` if an interrupt is
/// pending, `Ok(())` otherwise.
///
/// Callers place this at safe points between critical sections: the end of
/// a file copy, between staging regions, between phases. `data` is only
/// invoked when an interrupt is actually pending, so it can be a closure
/// that clones or snapshots whatever partial result is currently
/// accumulating without paying that cost on the common path.
pub fn checkpoint<T>(data: impl FnOnce() -> T) -> Result<(), Interrupted<T>> {
    if is_interrupted() {
        Err(Interrupted::new(data()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    // The interrupt flag is process-global; serialize tests that touch it.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn lock() -> MutexGuard<'static, ()> {
        TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[test]
    fn checkpoint_is_ok_when_nothing_pending() {
        let _lock = lock();
        reset_for_testing();
        assert!(checkpoint(|| unreachable!("data closure must not run")).is_ok());
    }

    #[test]
    fn checkpoint_carries_partial_result_once_interrupted() {
        let _lock = lock();
        reset_for_testing();
        simulate_interrupt_for_testing();

        let result = checkpoint(|| vec!["a.jpg", "b.jpg"]);
        let err = result.expect_err("interrupt was simulated");
        assert_eq!(err.data, vec!["a.jpg", "b.jpg"]);

        reset_for_testing();
    }

    #[test]
    fn guard_tracks_nesting_depth_per_thread() {
        assert!(!Guard::is_masked());
        let outer = Guard::enter();
        assert!(Guard::is_masked());
        let inner = Guard::enter();
        assert!(Guard::is_masked());
        drop(inner);
        assert!(Guard::is_masked());
        drop(outer);
        assert!(!Guard::is_masked());
    }

    #[test]
    fn delay_keyboard_interrupt_returns_the_closures_value() {
        let value = delay_keyboard_interrupt(|| 1 + 1);
        assert_eq!(value, 2);
    }
}
