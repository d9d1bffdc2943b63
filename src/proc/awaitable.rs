//! Externally settled values a process can wait on.
//!
//! An [`Awaitable`] is anything that eventually succeeds or fails exactly
//! once and reports it through a callback, from any thread. Waiting on
//! one still races the process's close channel, so closing a process
//! abandons the wait.

use parking_lot::Mutex;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result;
use tokio::runtime::Handle;
use triomphe::Arc;

use crate::core::Term;

/// Receives the outcome of an [`Awaitable`].
pub type Settle = Box<dyn FnOnce(::std::result::Result<Term, Term>) + Send + 'static>;

/// A value that settles once, successfully or with an error.
pub trait Awaitable: Send + 'static {
  /// Arranges for `on_settle` to be called with the outcome.
  ///
  /// May call `on_settle` inline if the outcome is already known.
  fn settle(self: Box<Self>, on_settle: Settle);
}

// -----------------------------------------------------------------------------
// Promise
// -----------------------------------------------------------------------------

#[derive(Default)]
struct PromiseState {
  outcome: Option<::std::result::Result<Term, Term>>,
  waiter: Option<Settle>,
}

/// The waiting half of a one-shot promise.
pub struct Promise {
  shared: Arc<Mutex<PromiseState>>,
}

/// The settling half of a one-shot promise.
///
/// Dropping a resolver without settling rejects the promise.
pub struct Resolver {
  shared: Option<Arc<Mutex<PromiseState>>>,
}

impl Promise {
  /// Creates a pending promise and its resolver.
  pub fn new() -> (Self, Resolver) {
    let shared: Arc<Mutex<PromiseState>> = Arc::new(Mutex::new(PromiseState::default()));

    let resolver: Resolver = Resolver {
      shared: Some(Arc::clone(&shared)),
    };

    (Self { shared }, resolver)
  }

  /// Creates a promise that is already fulfilled.
  pub fn resolved(value: Term) -> Self {
    let (promise, resolver): (Self, Resolver) = Self::new();
    resolver.resolve(value);
    promise
  }

  /// Creates a promise that is already rejected.
  pub fn rejected(error: Term) -> Self {
    let (promise, resolver): (Self, Resolver) = Self::new();
    resolver.reject(error);
    promise
  }
}

impl Awaitable for Promise {
  fn settle(self: Box<Self>, on_settle: Settle) {
    let mut state: _ = self.shared.lock();

    match state.outcome.take() {
      Some(outcome) => {
        drop(state);
        on_settle(outcome);
      }
      None => {
        state.waiter = Some(on_settle);
      }
    }
  }
}

impl Debug for Promise {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.write_str("Promise(..)")
  }
}

impl Resolver {
  /// Fulfills the promise with `value`.
  #[inline]
  pub fn resolve(mut self, value: Term) {
    self.complete(Ok(value));
  }

  /// Rejects the promise with `error`.
  #[inline]
  pub fn reject(mut self, error: Term) {
    self.complete(Err(error));
  }

  fn complete(&mut self, outcome: ::std::result::Result<Term, Term>) {
    let Some(shared) = self.shared.take() else {
      return;
    };

    let mut state: _ = shared.lock();

    match state.waiter.take() {
      Some(waiter) => {
        drop(state);
        waiter(outcome);
      }
      None => {
        state.outcome = Some(outcome);
      }
    }
  }
}

impl Drop for Resolver {
  fn drop(&mut self) {
    if self.shared.is_some() {
      self.complete(Err(Term::new(String::from("promise resolver dropped"))));
    }
  }
}

impl Debug for Resolver {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.write_str("Resolver(..)")
  }
}

// -----------------------------------------------------------------------------
// Tokio Bridge
// -----------------------------------------------------------------------------

/// Runs `future` on a tokio runtime and returns a promise of its output.
///
/// If the task panics or is cancelled the promise is rejected.
pub fn spawn_future<F>(handle: &Handle, future: F) -> Promise
where
  F: Future<Output = ::std::result::Result<Term, Term>> + Send + 'static,
{
  let (promise, resolver): (Promise, Resolver) = Promise::new();

  handle.spawn(async move {
    match future.await {
      Ok(value) => resolver.resolve(value),
      Err(error) => resolver.reject(error),
    }
  });

  promise
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use parking_lot::Mutex;
  use std::sync::Arc;

  use crate::core::Term;
  use crate::proc::Awaitable;
  use crate::proc::Promise;
  use crate::proc::Resolver;

  type Outcome = Arc<Mutex<Option<Result<Term, Term>>>>;

  fn watch(promise: Promise) -> Outcome {
    let outcome: Outcome = Outcome::default();
    let slot: Outcome = Arc::clone(&outcome);

    Box::new(promise).settle(Box::new(move |result| *slot.lock() = Some(result)));

    outcome
  }

  #[test]
  fn test_settle_after_resolve() {
    let outcome: Outcome = watch(Promise::resolved(Term::new(5)));

    assert_eq!(*outcome.lock(), Some(Ok(Term::new(5))));
  }

  #[test]
  fn test_resolve_after_settle() {
    let (promise, resolver): (Promise, Resolver) = Promise::new();
    let outcome: Outcome = watch(promise);

    assert!(outcome.lock().is_none());
    resolver.reject(Term::new("bad"));
    assert_eq!(*outcome.lock(), Some(Err(Term::new("bad"))));
  }

  #[test]
  fn test_dropped_resolver_rejects() {
    let (promise, resolver): (Promise, Resolver) = Promise::new();
    let outcome: Outcome = watch(promise);

    drop(resolver);

    assert!(matches!(*outcome.lock(), Some(Err(_))));
  }
}
