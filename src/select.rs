//! Choice over several channel operations.
//!
//! [`do_alts`] registers every operation with handlers sharing one
//! [`AltFlag`], so at most one of them ever completes. Operations are
//! attempted in random order unless priority is requested, in which case
//! list order wins among those ready immediately.

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result;
use triomphe::Arc;

use crate::chan::Channel;
use crate::core::Term;
use crate::dispatch;
use crate::dispatch::Entered;
use crate::proc::AltCallbacks;
use crate::proc::AltFlag;
use crate::proc::AltHandler;
use crate::proc::Callback;
use crate::proc::Completion;
use crate::raise;

type AltsCallback = Box<dyn FnOnce(AltResult) + Send + 'static>;

// -----------------------------------------------------------------------------
// Operation
// -----------------------------------------------------------------------------

/// One candidate operation of an alts call.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
  /// Take a value from the channel.
  Take(Channel),
  /// Put the value onto the channel.
  Put(Channel, Term),
}

impl Operation {
  /// Returns the channel this operation targets.
  #[inline]
  pub const fn channel(&self) -> &Channel {
    match self {
      Self::Take(channel) => channel,
      Self::Put(channel, _) => channel,
    }
  }
}

impl From<Channel> for Operation {
  #[inline]
  fn from(other: Channel) -> Self {
    Self::Take(other)
  }
}

impl From<&Channel> for Operation {
  #[inline]
  fn from(other: &Channel) -> Self {
    Self::Take(other.clone())
  }
}

impl From<(Channel, Term)> for Operation {
  #[inline]
  fn from(other: (Channel, Term)) -> Self {
    Self::Put(other.0, other.1)
  }
}

// -----------------------------------------------------------------------------
// Options
// -----------------------------------------------------------------------------

/// Modifiers for an alts call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AltsOptions {
  /// Value to complete with when no operation is immediately ready.
  pub default: Option<Term>,
  /// Attempt operations in list order instead of random order.
  pub priority: bool,
}

impl AltsOptions {
  #[inline]
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn with_default(mut self, value: Term) -> Self {
    self.default = Some(value);
    self
  }

  #[inline]
  pub fn with_priority(mut self) -> Self {
    self.priority = true;
    self
  }
}

// -----------------------------------------------------------------------------
// Result
// -----------------------------------------------------------------------------

/// Where an alts result came from.
#[derive(Clone, Debug, PartialEq)]
pub enum Port {
  /// The operation on this channel completed.
  Channel(Channel),
  /// Nothing was ready and the default value was used.
  Default,
}

/// Outcome of an alts call.
///
/// For a take, `value` is the taken value (possibly [`CLOSED`]). For a put
/// it is `true` if delivered or `false` if the channel was closed.
///
/// [`CLOSED`]: crate::core::CLOSED
#[derive(Clone, Debug, PartialEq)]
pub struct AltResult {
  pub value: Term,
  pub port: Port,
}

impl AltResult {
  /// Returns `true` if this result came from `channel`.
  #[inline]
  pub fn is_from(&self, channel: &Channel) -> bool {
    matches!(&self.port, Port::Channel(port) if port == channel)
  }

  /// Returns `true` if this result is the default value.
  #[inline]
  pub const fn is_default(&self) -> bool {
    matches!(self.port, Port::Default)
  }
}

// -----------------------------------------------------------------------------
// Alts
// -----------------------------------------------------------------------------

// Holds the user continuation until one operation claims it.
#[derive(Clone)]
struct Shared {
  inner: Arc<Mutex<Option<AltsCallback>>>,
}

impl Shared {
  fn new(callback: AltsCallback) -> Self {
    Self {
      inner: Arc::new(Mutex::new(Some(callback))),
    }
  }

  fn deliver(&self, result: AltResult) {
    let callback: Option<AltsCallback> = self.inner.lock().take();

    if let Some(callback) = callback {
      callback(result);
    }
  }

  fn callback(&self, channel: &Channel) -> Callback {
    let shared: Shared = self.clone();
    let port: Channel = channel.clone();

    Box::new(move |value: Term| {
      shared.deliver(AltResult {
        value,
        port: Port::Channel(port),
      });
    })
  }
}

impl Debug for Shared {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.write_str("Shared(..)")
  }
}

/// Completes exactly one of `operations`, then invokes `callback`.
///
/// If an operation is ready now, `callback` runs before this returns.
/// Otherwise, if a default is given it completes with [`Port::Default`];
/// if not, every operation waits and the first to complete wins.
///
/// # Panics
///
/// Raises [`BadArg`] if `operations` is empty, or if an operation puts
/// [`CLOSED`].
///
/// [`BadArg`]: crate::error::ExceptionGroup::BadArg
/// [`CLOSED`]: crate::core::CLOSED
pub fn do_alts<F>(operations: Vec<Operation>, callback: F, options: AltsOptions)
where
  F: FnOnce(AltResult) + Send + 'static,
{
  if operations.is_empty() {
    raise!(BadArg, "alts requires at least one operation");
  }

  let _entered: Entered = dispatch::enter();

  let mut operations: Vec<Operation> = operations;
  let flag: AltFlag = AltFlag::new();
  let shared: Shared = Shared::new(Box::new(callback));

  if !options.priority {
    operations.shuffle(&mut rand::thread_rng());
  }

  // Continuations capture their port; the winner releases the others.
  let callbacks: AltCallbacks = AltCallbacks::new(
    operations
      .iter()
      .map(|operation| shared.callback(operation.channel()))
      .collect(),
  );

  for (index, operation) in operations.into_iter().enumerate() {
    let handler: Box<AltHandler> = Box::new(AltHandler::new(flag.clone(), index, callbacks.clone()));

    let completion: Option<Completion> = match operation {
      Operation::Put(channel, value) => channel.put(value, handler),
      Operation::Take(channel) => channel.take(handler),
    };

    if let Some(completion) = completion {
      completion.resume();
      return;
    }
  }

  if let Some(value) = options.default {
    if flag.claim() {
      callbacks.release();
      shared.deliver(AltResult {
        value,
        port: Port::Default,
      });
    }
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use parking_lot::Mutex;
  use std::sync::Arc;

  use crate::chan::Channel;
  use crate::chan::buffers;
  use crate::core::Term;
  use crate::proc::ops;
  use crate::select::AltResult;
  use crate::select::AltsOptions;
  use crate::select::Operation;
  use crate::select::do_alts;

  type Slot = Arc<Mutex<Vec<AltResult>>>;

  fn record(slot: &Slot) -> impl FnOnce(AltResult) + Send + 'static {
    let slot: Slot = Arc::clone(slot);
    move |result| slot.lock().push(result)
  }

  #[test]
  fn test_priority_prefers_first_ready() {
    let a: Channel = Channel::with_buffer(buffers::fixed(1));
    let b: Channel = Channel::with_buffer(buffers::fixed(1));
    let slot: Slot = Slot::default();

    ops::put_async(&a, Term::new(1), |_| {});
    ops::put_async(&b, Term::new(2), |_| {});

    do_alts(
      vec![Operation::Take(a.clone()), Operation::Take(b.clone())],
      record(&slot),
      AltsOptions::new().with_priority(),
    );

    let results: _ = slot.lock();

    assert_eq!(results.len(), 1);
    assert!(results[0].is_from(&a));
    assert_eq!(results[0].value, Term::new(1));
    assert_eq!(b.count(), 1);
  }

  #[test]
  fn test_default_when_nothing_ready() {
    let a: Channel = Channel::unbuffered();
    let slot: Slot = Slot::default();

    do_alts(
      vec![Operation::Take(a.clone())],
      record(&slot),
      AltsOptions::new().with_default(Term::new("idle")),
    );

    assert_eq!(slot.lock().len(), 1);
    assert!(slot.lock()[0].is_default());
    assert_eq!(slot.lock()[0].value, Term::new("idle"));

    // The registered take was deactivated by the default.
    ops::put_async(&a, Term::new(1), |_| {});
    assert_eq!(slot.lock().len(), 1);
  }

  #[test]
  fn test_only_one_operation_completes() {
    let a: Channel = Channel::unbuffered();
    let b: Channel = Channel::unbuffered();
    let slot: Slot = Slot::default();
    let delivered: Arc<Mutex<Vec<bool>>> = Arc::default();

    do_alts(
      vec![Operation::Take(a.clone()), Operation::Take(b.clone())],
      record(&slot),
      AltsOptions::new(),
    );

    assert!(slot.lock().is_empty());

    for channel in [&a, &b] {
      let delivered: Arc<Mutex<Vec<bool>>> = Arc::clone(&delivered);
      ops::put_async(channel, Term::new(7), move |ok| delivered.lock().push(ok));
    }

    assert_eq!(slot.lock().len(), 1);
    assert_eq!(slot.lock()[0].value, Term::new(7));

    // Exactly one put rendezvoused, the other is still pending.
    assert_eq!(*delivered.lock(), vec![true]);
  }

  #[test]
  fn test_losing_operations_release_their_channels() {
    let a: Channel = Channel::unbuffered();
    let b: Channel = Channel::unbuffered();
    let slot: Slot = Slot::default();

    do_alts(
      vec![Operation::Take(a.clone()), Operation::Take(b.clone())],
      record(&slot),
      AltsOptions::new(),
    );

    assert!(b.handle_count() > 1);

    ops::offer(&a, Term::new(1));

    assert_eq!(slot.lock().len(), 1);
    assert!(slot.lock()[0].is_from(&a));

    // The stale take on `b` no longer holds `b` itself.
    assert_eq!(b.handle_count(), 1);
  }

  #[test]
  fn test_default_releases_registered_operations() {
    let a: Channel = Channel::unbuffered();
    let slot: Slot = Slot::default();

    do_alts(
      vec![Operation::Take(a.clone())],
      record(&slot),
      AltsOptions::new().with_default(Term::unit()),
    );

    assert!(slot.lock()[0].is_default());
    assert_eq!(a.handle_count(), 1);
  }

  #[test]
  fn test_put_on_closed_channel_reports_false() {
    let a: Channel = Channel::unbuffered();
    let slot: Slot = Slot::default();

    a.close();

    do_alts(
      vec![Operation::Put(a.clone(), Term::new(1))],
      record(&slot),
      AltsOptions::new(),
    );

    assert_eq!(slot.lock()[0].value, Term::new(false));
    assert!(slot.lock()[0].is_from(&a));
  }

  #[test]
  fn test_empty_operations_rejected() {
    let outcome: _ = std::panic::catch_unwind(|| do_alts(Vec::new(), |_| {}, AltsOptions::new()));

    assert!(outcome.is_err());
  }
}
