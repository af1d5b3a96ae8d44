//! Per-thread guard against remote round trips.
//!
//! Every method returning [`crate::Blocking`] may suspend the calling thread
//! until the debuggee answers. Threads that must never do that (IDE UI threads)
//! hold a [`ForbidBlockingGuard`]; while it is alive, an operation that would
//! actually suspend fails with [`ValueError::WouldBlock`] instead. Reads served
//! from already-completed loads are unaffected.

use std::cell::Cell;
use std::marker::PhantomData;

use crate::error::{ValueError, ValueResult};

thread_local! {
    static FORBID_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Forbids blocking on the current thread until dropped. Guards nest.
#[must_use = "blocking is only forbidden while the guard is alive"]
pub struct ForbidBlockingGuard {
    // Tied to the thread that created it.
    _not_send: PhantomData<*const ()>,
}

pub fn forbid_blocking() -> ForbidBlockingGuard {
    FORBID_DEPTH.with(|depth| depth.set(depth.get() + 1));
    ForbidBlockingGuard {
        _not_send: PhantomData,
    }
}

impl Drop for ForbidBlockingGuard {
    fn drop(&mut self) {
        FORBID_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

pub fn is_blocking_forbidden() -> bool {
    FORBID_DEPTH.with(|depth| depth.get() > 0)
}

pub(crate) fn check(operation: &'static str) -> ValueResult<()> {
    if is_blocking_forbidden() {
        Err(ValueError::WouldBlock(operation))
    } else {
        Ok(())
    }
}
