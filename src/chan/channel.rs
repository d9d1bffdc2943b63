use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;
use std::hash::Hash;
use std::hash::Hasher;
use std::mem;
use std::sync::OnceLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use triomphe::Arc;

use crate::chan::buffers::Buffer;
use crate::chan::xform::ExHandler;
use crate::chan::xform::Flow;
use crate::chan::xform::Identity;
use crate::chan::xform::Transducer;
use crate::chan::xform::default_ex_handler;
use crate::consts::MAX_DIRTY;
use crate::consts::MAX_QUEUE_SIZE;
use crate::core::Term;
use crate::dispatch;
use crate::dispatch::Entered;
use crate::proc::Callback;
use crate::proc::Completion;
use crate::proc::Handler;
use crate::proc::Process;
use crate::raise;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

// -----------------------------------------------------------------------------
// Channel Id
// -----------------------------------------------------------------------------

/// Unique identifier of a channel, used in diagnostics.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ChannelId(u64);

impl ChannelId {
  #[inline]
  fn next() -> Self {
    Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
  }

  #[inline]
  pub const fn into_u64(self) -> u64 {
    self.0
  }
}

impl Display for ChannelId {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(f, "#Chan<{}>", self.0)
  }
}

// -----------------------------------------------------------------------------
// Channel
// -----------------------------------------------------------------------------

/// A CSP channel: a rendezvous point between putters and takers.
///
/// Cloning a channel produces another handle to the same channel.
/// Channels compare equal only to their own handles.
///
/// `put` and `take` are the primitive protocol used by the higher-level
/// operations. Each either completes now, returning a [`Completion`], or
/// registers the handler and returns [`None`]. Waiting handlers are always
/// resumed through the dispatcher.
#[derive(Clone)]
pub struct Channel {
  inner: Arc<ChannelInner>,
}

struct ChannelInner {
  id: ChannelId,
  state: Mutex<State>,
  ex_handler: Mutex<ExHandler>,
  process: OnceLock<Process>,
}

impl Channel {
  /// Creates a channel with the given buffer, or an unbuffered one.
  #[inline]
  pub fn new(buffer: Option<Box<dyn Buffer>>) -> Self {
    Self::from_parts(buffer, Box::new(Identity), default_ex_handler())
  }

  /// Creates a rendezvous channel.
  #[inline]
  pub fn unbuffered() -> Self {
    Self::new(None)
  }

  /// Creates a channel backed by `buffer`.
  #[inline]
  pub fn with_buffer<B>(buffer: B) -> Self
  where
    B: Buffer,
  {
    Self::new(Some(Box::new(buffer)))
  }

  /// Creates a buffered channel whose puts pass through `xform`.
  ///
  /// Errors from `xform` go to `ex_handler`, or are logged and dropped if
  /// no handler is given. `xform` runs under the channel lock and must not
  /// use the channel; `ex_handler` runs after the lock is released.
  ///
  /// # Panics
  ///
  /// Raises [`BadArg`] if `buffer` is [`None`].
  ///
  /// [`BadArg`]: crate::error::ExceptionGroup::BadArg
  pub fn with_transducer<X>(
    buffer: Option<Box<dyn Buffer>>,
    xform: X,
    ex_handler: Option<ExHandler>,
  ) -> Self
  where
    X: Transducer,
  {
    if buffer.is_none() {
      raise!(BadArg, "only buffered channels can use transducers");
    }

    Self::from_parts(
      buffer,
      Box::new(xform),
      ex_handler.unwrap_or_else(default_ex_handler),
    )
  }

  fn from_parts(
    buffer: Option<Box<dyn Buffer>>,
    xform: Box<dyn Transducer>,
    ex_handler: ExHandler,
  ) -> Self {
    Self {
      inner: Arc::new(ChannelInner {
        id: ChannelId::next(),
        state: Mutex::new(State {
          buffer,
          xform,
          takes: VecDeque::new(),
          puts: VecDeque::new(),
          dirty_takes: 0,
          dirty_puts: 0,
          closed: false,
        }),
        ex_handler: Mutex::new(ex_handler),
        process: OnceLock::new(),
      }),
    }
  }

  #[inline]
  pub fn id(&self) -> ChannelId {
    self.inner.id
  }

  #[inline]
  pub fn is_closed(&self) -> bool {
    self.inner.state.lock().closed
  }

  /// Returns the number of values currently buffered.
  #[inline]
  pub fn count(&self) -> usize {
    self
      .inner
      .state
      .lock()
      .buffer
      .as_deref()
      .map_or(0, |buffer| buffer.count())
  }

  /// Returns the process whose result this channel carries, if any.
  #[inline]
  pub fn process(&self) -> Option<&Process> {
    self.inner.process.get()
  }

  #[inline]
  pub(crate) fn attach(&self, process: Process) {
    let _ignore: _ = self.inner.process.set(process);
  }

  #[cfg(test)]
  pub(crate) fn handle_count(&self) -> usize {
    Arc::count(&self.inner)
  }

  /// Offers `value` to the channel on behalf of `handler`.
  ///
  /// On immediate completion the result is `true` if the value was
  /// delivered and `false` if the channel was already closed.
  ///
  /// # Panics
  ///
  /// Raises [`BadArg`] if `value` is [`CLOSED`], and [`SysCap`] if the
  /// pending put queue is full.
  ///
  /// [`BadArg`]: crate::error::ExceptionGroup::BadArg
  /// [`SysCap`]: crate::error::ExceptionGroup::SysCap
  /// [`CLOSED`]: crate::core::CLOSED
  pub fn put(&self, value: Term, handler: Box<dyn Handler>) -> Option<Completion> {
    if value.is_closed() {
      raise!(BadArg, "cannot put CLOSED on a channel");
    }

    let _entered: Entered = dispatch::enter();
    let mut wakeups: Wakeups = Wakeups::default();
    let completion: Option<Completion> = self.inner.state.lock().put(value, handler, &mut wakeups);

    self.settle(&mut wakeups);
    wakeups.dispatch();
    completion
  }

  /// Requests a value from the channel on behalf of `handler`.
  ///
  /// A closed, drained channel completes immediately with [`CLOSED`].
  ///
  /// # Panics
  ///
  /// Raises [`SysCap`] if the pending take queue is full.
  ///
  /// [`SysCap`]: crate::error::ExceptionGroup::SysCap
  /// [`CLOSED`]: crate::core::CLOSED
  pub fn take(&self, handler: Box<dyn Handler>) -> Option<Completion> {
    let _entered: Entered = dispatch::enter();
    let mut wakeups: Wakeups = Wakeups::default();
    let completion: Option<Completion> = self.inner.state.lock().take(handler, &mut wakeups);

    self.settle(&mut wakeups);
    wakeups.dispatch();
    completion
  }

  /// Closes the channel. Idempotent.
  ///
  /// Buffered values stay available to takers. Waiting takers beyond
  /// those receive [`CLOSED`]; waiting putters receive `false`.
  ///
  /// [`CLOSED`]: crate::core::CLOSED
  pub fn close(&self) {
    let _entered: Entered = dispatch::enter();
    let mut wakeups: Wakeups = Wakeups::default();

    self.inner.state.lock().close(&mut wakeups);

    tracing::trace!(channel = %self.inner.id, woken = wakeups.len(), "channel closed");

    wakeups.dispatch();
  }

  // Hands failed transducer steps to the exception handler. The state lock
  // is free here, so the handler may use this channel.
  fn settle(&self, wakeups: &mut Wakeups) {
    for error in mem::take(&mut wakeups.errors) {
      let Some(mut ex_handler) = self.inner.ex_handler.try_lock() else {
        tracing::error!(channel = %self.inner.id, %error, "exception handler re-entered, error dropped");
        continue;
      };

      let replacement: Option<Term> = (*ex_handler)(error);

      drop(ex_handler);

      if let Some(value) = replacement.filter(|value| !value.is_closed()) {
        self.inner.state.lock().accept(value, wakeups);
      }
    }
  }
}

impl Debug for Channel {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.debug_tuple("Channel").field(&self.inner.id.0).finish()
  }
}

impl PartialEq for Channel {
  #[inline]
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }
}

impl Eq for Channel {}

impl Hash for Channel {
  #[inline]
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.inner.id.hash(state);
  }
}

// -----------------------------------------------------------------------------
// Wakeups
// -----------------------------------------------------------------------------

// Continuations and transducer errors collected under the state lock,
// handled after release.
#[derive(Default)]
struct Wakeups {
  items: Vec<(Callback, Term)>,
  errors: Vec<Term>,
}

impl Wakeups {
  #[inline]
  fn schedule(&mut self, callback: Callback, value: Term) {
    self.items.push((callback, value));
  }

  #[inline]
  fn len(&self) -> usize {
    self.items.len()
  }

  fn dispatch(self) {
    for (callback, value) in self.items {
      dispatch::run(move || callback(value));
    }
  }
}

// -----------------------------------------------------------------------------
// State
// -----------------------------------------------------------------------------

struct PendingPut {
  handler: Box<dyn Handler>,
  value: Term,
}

struct State {
  buffer: Option<Box<dyn Buffer>>,
  xform: Box<dyn Transducer>,
  takes: VecDeque<Box<dyn Handler>>,
  puts: VecDeque<PendingPut>,
  dirty_takes: usize,
  dirty_puts: usize,
  closed: bool,
}

impl State {
  fn put(
    &mut self,
    value: Term,
    handler: Box<dyn Handler>,
    wakeups: &mut Wakeups,
  ) -> Option<Completion> {
    if !handler.is_active() {
      return Some(Completion::new(Term::new(!self.closed), None));
    }

    if self.closed {
      return Some(Completion::new(Term::new(false), handler.commit()));
    }

    if self.buffer.as_deref().is_some_and(|buffer| !buffer.is_full()) {
      let callback: Option<Callback> = handler.commit();
      let reduced: bool = self.step(value, wakeups);

      self.flush_buffer(wakeups);

      if reduced {
        self.close(wakeups);
      }

      return Some(Completion::new(Term::new(true), callback));
    }

    while let Some(taker) = self.takes.pop_front() {
      if taker.is_active() {
        let callback: Option<Callback> = handler.commit();

        if let Some(wake) = taker.commit() {
          wakeups.schedule(wake, value);
        }

        return Some(Completion::new(Term::new(true), callback));
      }
    }

    if self.dirty_puts > MAX_DIRTY {
      self.puts.retain(|put| put.handler.is_active());
      self.dirty_puts = 0;
    } else {
      self.dirty_puts += 1;
    }

    if handler.is_blockable() {
      if self.puts.len() >= MAX_QUEUE_SIZE {
        raise!(
          SysCap,
          format_args!("no more than {MAX_QUEUE_SIZE} pending puts are allowed on a single channel"),
        );
      }

      self.puts.push_back(PendingPut { handler, value });
    }

    None
  }

  fn take(&mut self, handler: Box<dyn Handler>, wakeups: &mut Wakeups) -> Option<Completion> {
    if !handler.is_active() {
      return None;
    }

    if let Some(value) = self.buffer.as_deref_mut().and_then(|buffer| buffer.remove()) {
      let callback: Option<Callback> = handler.commit();

      self.refill(wakeups);

      return Some(Completion::new(value, callback));
    }

    while let Some(putter) = self.puts.pop_front() {
      if putter.handler.is_active() {
        let callback: Option<Callback> = handler.commit();

        if let Some(wake) = putter.handler.commit() {
          wakeups.schedule(wake, Term::new(true));
        }

        return Some(Completion::new(putter.value, callback));
      }
    }

    if self.closed {
      return Some(Completion::new(Term::closed(), handler.commit()));
    }

    if self.dirty_takes > MAX_DIRTY {
      self.takes.retain(|take| take.is_active());
      self.dirty_takes = 0;
    } else {
      self.dirty_takes += 1;
    }

    if handler.is_blockable() {
      if self.takes.len() >= MAX_QUEUE_SIZE {
        raise!(
          SysCap,
          format_args!("no more than {MAX_QUEUE_SIZE} pending takes are allowed on a single channel"),
        );
      }

      self.takes.push_back(handler);
    }

    None
  }

  fn close(&mut self, wakeups: &mut Wakeups) {
    if self.closed {
      return;
    }

    self.closed = true;

    if let Some(buffer) = self.buffer.as_deref_mut() {
      self.xform.complete(buffer);
    }

    self.flush_buffer(wakeups);

    while let Some(taker) = self.takes.pop_front() {
      if taker.is_active() {
        if let Some(wake) = taker.commit() {
          wakeups.schedule(wake, Term::closed());
        }
      }
    }

    while let Some(putter) = self.puts.pop_front() {
      if putter.handler.is_active() {
        if let Some(wake) = putter.handler.commit() {
          wakeups.schedule(wake, Term::new(false));
        }
      }
    }
  }

  // Runs `value` through the transducer into the buffer. Returns `true`
  // once the transducer is reduced.
  fn step(&mut self, value: Term, wakeups: &mut Wakeups) -> bool {
    let Self { buffer, xform, .. } = self;

    let Some(buffer) = buffer.as_deref_mut() else {
      return false;
    };

    match xform.step(buffer, value) {
      Ok(flow) => flow == Flow::Reduced,
      Err(error) => {
        wakeups.errors.push(error);
        false
      }
    }
  }

  // Adds an exception handler's replacement value to the buffer.
  fn accept(&mut self, value: Term, wakeups: &mut Wakeups) {
    if let Some(buffer) = self.buffer.as_deref_mut() {
      buffer.add(value);
    }

    self.flush_buffer(wakeups);
  }

  // Hands buffered values to waiting takers, oldest first.
  fn flush_buffer(&mut self, wakeups: &mut Wakeups) {
    let Self { buffer, takes, .. } = self;

    let Some(buffer) = buffer.as_deref_mut() else {
      return;
    };

    while buffer.count() > 0 {
      let Some(taker) = takes.pop_front() else {
        break;
      };

      if !taker.is_active() {
        continue;
      }

      if let Some(wake) = taker.commit() {
        if let Some(value) = buffer.remove() {
          wakeups.schedule(wake, value);
        }
      }
    }
  }

  // Moves pending puts into freed buffer space.
  fn refill(&mut self, wakeups: &mut Wakeups) {
    while self.buffer.as_deref().is_some_and(|buffer| !buffer.is_full()) {
      let Some(putter) = self.puts.pop_front() else {
        break;
      };

      if putter.handler.is_active() {
        if let Some(wake) = putter.handler.commit() {
          wakeups.schedule(wake, Term::new(true));
        }

        if self.step(putter.value, wakeups) {
          self.close(wakeups);
        }
      }
    }
  }
}
