//! The scheduler lock.
//!
//! Every runtime entry point (channel operations, alts, process steps,
//! dispatcher drains) runs while holding one process-wide reentrant lock.
//! Hosts may call in from any thread, and timer callbacks arrive on the
//! timer thread, but at most one thread is ever inside the runtime. Nested
//! entries from the same thread are free.

use parking_lot::ReentrantMutex;
use parking_lot::ReentrantMutexGuard;
use parking_lot::const_reentrant_mutex;
use std::cell::Cell;

static SCHEDULER: ReentrantMutex<()> = const_reentrant_mutex(());

thread_local! {
  static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Proof that the current thread holds the scheduler lock.
pub(crate) struct Entered {
  _guard: ReentrantMutexGuard<'static, ()>,
}

impl Drop for Entered {
  #[inline]
  fn drop(&mut self) {
    DEPTH.with(|depth| depth.set(depth.get() - 1));
  }
}

/// Acquires the scheduler lock for the current thread.
#[inline]
pub(crate) fn enter() -> Entered {
  let guard: ReentrantMutexGuard<'static, ()> = SCHEDULER.lock();

  DEPTH.with(|depth| depth.set(depth.get() + 1));

  Entered { _guard: guard }
}

/// Returns `true` if the current thread is executing inside the runtime.
#[inline]
pub(crate) fn is_entered() -> bool {
  DEPTH.with(|depth| depth.get() != 0)
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::dispatch::scheduler::enter;
  use crate::dispatch::scheduler::is_entered;

  #[test]
  fn test_nested_entry() {
    assert!(!is_entered());

    {
      let _outer = enter();
      let _inner = enter();

      assert!(is_entered());
    }

    assert!(!is_entered());
  }
}
