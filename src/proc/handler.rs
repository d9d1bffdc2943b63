//! Continuation handlers registered on channels.
//!
//! A channel never calls user code directly. It asks a [`Handler`] to
//! *commit*, which hands back the continuation, and schedules that
//! continuation on the dispatcher later. Deciding which operation
//! completes is thus separate from running what comes next.

use parking_lot::Mutex;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result;
use std::mem;
use triomphe::Arc;

use crate::core::Term;
use crate::loom::sync::atomic::AtomicBool;
use crate::loom::sync::atomic::Ordering;

/// Continuation invoked with the result of a channel operation.
pub type Callback = Box<dyn FnOnce(Term) + Send + 'static>;

/// A pending interest in a channel operation.
pub trait Handler: Send + 'static {
  /// Returns `true` while the handler may still be committed.
  fn is_active(&self) -> bool;

  /// Returns `true` if the operation may wait in a pending queue.
  fn is_blockable(&self) -> bool;

  /// Marks the handler as used and returns its continuation.
  ///
  /// Only the first commit of a handler, or of any handler sharing its
  /// alt flag, yields a continuation. Later commits return [`None`].
  fn commit(&self) -> Option<Callback>;
}

// -----------------------------------------------------------------------------
// Completion
// -----------------------------------------------------------------------------

/// An operation that completed immediately.
///
/// Holds the result together with the continuation obtained by committing
/// the caller's handler, if any.
pub struct Completion {
  value: Term,
  callback: Option<Callback>,
}

impl Completion {
  #[inline]
  pub(crate) fn new(value: Term, callback: Option<Callback>) -> Self {
    Self { value, callback }
  }

  #[inline]
  pub const fn value(&self) -> &Term {
    &self.value
  }

  /// Discards the continuation and returns the result.
  #[inline]
  pub fn into_value(self) -> Term {
    self.value
  }

  /// Invokes the continuation with the result, inline.
  #[inline]
  pub fn resume(self) {
    if let Some(callback) = self.callback {
      callback(self.value);
    }
  }
}

impl Debug for Completion {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.debug_struct("Completion")
      .field("value", &self.value)
      .finish_non_exhaustive()
  }
}

// -----------------------------------------------------------------------------
// Fn Handler
// -----------------------------------------------------------------------------

/// A handler wrapping a single continuation. Always active.
pub struct FnHandler {
  blockable: bool,
  callback: Mutex<Option<Callback>>,
}

impl FnHandler {
  #[inline]
  pub fn new(blockable: bool, callback: Option<Callback>) -> Self {
    Self {
      blockable,
      callback: Mutex::new(callback),
    }
  }

  /// Handler for an operation that may wait.
  #[inline]
  pub fn blocking(callback: Callback) -> Self {
    Self::new(true, Some(callback))
  }

  /// Handler for an operation that completes now or not at all.
  #[inline]
  pub fn non_blocking() -> Self {
    Self::new(false, None)
  }
}

impl Handler for FnHandler {
  #[inline]
  fn is_active(&self) -> bool {
    true
  }

  #[inline]
  fn is_blockable(&self) -> bool {
    self.blockable
  }

  #[inline]
  fn commit(&self) -> Option<Callback> {
    self.callback.lock().take()
  }
}

impl Debug for FnHandler {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.debug_struct("FnHandler")
      .field("blockable", &self.blockable)
      .finish_non_exhaustive()
  }
}

// -----------------------------------------------------------------------------
// Alt Flag
// -----------------------------------------------------------------------------

/// One-shot flag shared by every handler of one alts call.
#[derive(Clone)]
pub struct AltFlag {
  inner: Arc<AtomicBool>,
}

impl AltFlag {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(AtomicBool::new(true)),
    }
  }

  #[inline]
  pub fn is_active(&self) -> bool {
    self.inner.load(Ordering::Acquire)
  }

  /// Deactivates the flag. Returns `true` for exactly one caller.
  #[inline]
  pub fn claim(&self) -> bool {
    self
      .inner
      .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }
}

impl Default for AltFlag {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl Debug for AltFlag {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.debug_tuple("AltFlag").field(&self.is_active()).finish()
  }
}

// -----------------------------------------------------------------------------
// Alt Handler
// -----------------------------------------------------------------------------

/// Continuations of every operation in one alts call.
///
/// The committing handler takes the whole set, so the losing
/// continuations and everything they captured are released together.
#[derive(Clone)]
pub struct AltCallbacks {
  inner: Arc<Mutex<Vec<Callback>>>,
}

impl AltCallbacks {
  #[inline]
  pub fn new(callbacks: Vec<Callback>) -> Self {
    Self {
      inner: Arc::new(Mutex::new(callbacks)),
    }
  }

  /// Returns the number of continuations not yet released.
  #[inline]
  pub fn len(&self) -> usize {
    self.inner.lock().len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.inner.lock().is_empty()
  }

  /// Takes the continuation at `index` and drops all the others.
  fn take(&self, index: usize) -> Option<Callback> {
    let mut callbacks: Vec<Callback> = mem::take(&mut *self.inner.lock());

    (index < callbacks.len()).then(|| callbacks.swap_remove(index))
  }

  /// Drops every continuation.
  #[inline]
  pub fn release(&self) {
    drop(mem::take(&mut *self.inner.lock()));
  }
}

impl Debug for AltCallbacks {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.debug_tuple("AltCallbacks").field(&self.len()).finish()
  }
}

/// A handler registered by one operation of an alts call.
///
/// Every handler of the call shares an [`AltFlag`] and one
/// [`AltCallbacks`]; committing any one of them deactivates all the
/// others and releases their continuations.
pub struct AltHandler {
  flag: AltFlag,
  index: usize,
  callbacks: AltCallbacks,
}

impl AltHandler {
  #[inline]
  pub fn new(flag: AltFlag, index: usize, callbacks: AltCallbacks) -> Self {
    Self {
      flag,
      index,
      callbacks,
    }
  }
}

impl Handler for AltHandler {
  #[inline]
  fn is_active(&self) -> bool {
    self.flag.is_active()
  }

  #[inline]
  fn is_blockable(&self) -> bool {
    true
  }

  fn commit(&self) -> Option<Callback> {
    if self.flag.claim() {
      self.callbacks.take(self.index)
    } else {
      None
    }
  }
}

impl Debug for AltHandler {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.debug_struct("AltHandler")
      .field("flag", &self.flag)
      .field("index", &self.index)
      .finish_non_exhaustive()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(all(test, not(loom)))]
mod tests {
  use parking_lot::Mutex;
  use std::sync::Arc;

  use crate::core::Term;
  use crate::proc::AltCallbacks;
  use crate::proc::AltFlag;
  use crate::proc::AltHandler;
  use crate::proc::Callback;
  use crate::proc::FnHandler;
  use crate::proc::Handler;

  #[test]
  fn test_fn_handler_commits_once() {
    let handler: FnHandler = FnHandler::blocking(Box::new(|_| {}));

    assert!(handler.is_active());
    assert!(handler.is_blockable());
    assert!(handler.commit().is_some());
    assert!(handler.commit().is_none());
    assert!(handler.is_active());
  }

  #[test]
  fn test_non_blocking_handler() {
    let handler: FnHandler = FnHandler::non_blocking();

    assert!(!handler.is_blockable());
    assert!(handler.commit().is_none());
  }

  #[test]
  fn test_alt_handlers_share_one_commit() {
    let hits: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let flag: AltFlag = AltFlag::new();

    let callbacks: AltCallbacks = AltCallbacks::new(
      (0..3_u8)
        .map(|index| {
          let hits: Arc<Mutex<Vec<u8>>> = Arc::clone(&hits);
          let callback: Callback = Box::new(move |_| hits.lock().push(index));
          callback
        })
        .collect(),
    );

    let handlers: Vec<AltHandler> = (0..3)
      .map(|index| AltHandler::new(flag.clone(), index, callbacks.clone()))
      .collect();

    let committed: Vec<Callback> = handlers.iter().rev().filter_map(Handler::commit).collect();

    assert_eq!(committed.len(), 1);
    assert!(handlers.iter().all(|handler| !handler.is_active()));
    assert!(callbacks.is_empty());

    for callback in committed {
      callback(Term::unit());
    }

    assert_eq!(*hits.lock(), vec![2]);
  }

  #[test]
  fn test_commit_releases_losing_captures() {
    let capture: Arc<()> = Arc::new(());
    let flag: AltFlag = AltFlag::new();

    let callbacks: AltCallbacks = AltCallbacks::new(
      (0..2)
        .map(|_| {
          let capture: Arc<()> = Arc::clone(&capture);
          let callback: Callback = Box::new(move |_| drop(capture));
          callback
        })
        .collect(),
    );

    let winner: AltHandler = AltHandler::new(flag.clone(), 0, callbacks.clone());
    let loser: AltHandler = AltHandler::new(flag, 1, callbacks);

    assert_eq!(Arc::strong_count(&capture), 3);

    let callback: Option<Callback> = winner.commit();

    // Only the winning continuation still holds its capture.
    assert_eq!(Arc::strong_count(&capture), 2);
    assert!(loser.commit().is_none());

    drop(callback);

    assert_eq!(Arc::strong_count(&capture), 1);
  }
}
