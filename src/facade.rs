use parking_lot::Condvar;
use parking_lot::Mutex;
use std::any::type_name;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result;
use triomphe::Arc;

use crate::chan::Channel;
use crate::chan::buffers;
use crate::chan::buffers::Buffer;
use crate::chan::buffers::DroppingBuffer;
use crate::chan::buffers::FixedBuffer;
use crate::chan::buffers::SlidingBuffer;
use crate::chan::xform::ExHandler;
use crate::chan::xform::Transducer;
use crate::core::Term;
use crate::dispatch;
use crate::error::Failure;
use crate::proc::Co;
use crate::proc::Coroutine;
use crate::proc::Exit;
use crate::proc::Interrupt;
use crate::proc::Process;
use crate::proc::Resume;
use crate::proc::from_async;
use crate::proc::ops;
use crate::raise;

// -----------------------------------------------------------------------------
// Spawning
// -----------------------------------------------------------------------------

/// Starts a process driving `coroutine` and returns its result channel.
///
/// The coroutine runs until its first suspension before this returns. The
/// result channel holds one value: the coroutine's return value, or a
/// [`Failure`] if it errored or panicked. It closes afterwards. A return
/// value of [`CLOSED`] closes the channel without a value. The process is
/// reachable through [`Channel::process`].
///
/// [`CLOSED`]: crate::core::CLOSED
pub fn spawn<C>(coroutine: C, creator: Option<&'static str>) -> Channel
where
  C: Coroutine,
{
  let result: Channel = Channel::with_buffer(buffers::fixed(1));
  let output: Channel = result.clone();

  let process: Process = Process::new(
    coroutine,
    move |exit: Exit| {
      let value: Term = match exit {
        Exit::Normal(value) => value,
        Exit::Failed(error) => Term::new(Failure::new(error)),
      };

      if value.is_closed() {
        output.close();
      } else {
        let closing: Channel = output.clone();
        ops::put_then_callback(&output, value, Some(Box::new(move |_| closing.close())));
      }
    },
    creator,
  );

  result.attach(process.clone());
  process.run(Resume::Next(Term::unit()));
  result
}

/// Spawns the coroutine built by `f`.
pub fn go<F, C>(f: F) -> Channel
where
  F: FnOnce() -> C,
  C: Coroutine,
{
  spawn(f(), Some(type_name::<F>()))
}

/// Spawns an `async` coroutine.
///
/// See [`Co`] for the instructions available inside the body.
pub fn go_async<F, Fut>(f: F) -> Channel
where
  F: FnOnce(Co) -> Fut,
  Fut: Future<Output = ::std::result::Result<Term, Interrupt>> + Send + 'static,
{
  spawn(from_async(f), Some(type_name::<F>()))
}

// -----------------------------------------------------------------------------
// Channels
// -----------------------------------------------------------------------------

/// Buffering for a new channel.
pub enum ChanSpec {
  Unbuffered,
  Fixed(usize),
  Buffer(Box<dyn Buffer>),
}

impl ChanSpec {
  fn into_buffer(self) -> Option<Box<dyn Buffer>> {
    match self {
      Self::Unbuffered => None,
      Self::Fixed(0) => None,
      Self::Fixed(capacity) => Some(Box::new(buffers::fixed(capacity))),
      Self::Buffer(buffer) => Some(buffer),
    }
  }
}

impl Debug for ChanSpec {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    match self {
      Self::Unbuffered => f.write_str("Unbuffered"),
      Self::Fixed(capacity) => f.debug_tuple("Fixed").field(capacity).finish(),
      Self::Buffer(buffer) => f.debug_tuple("Buffer").field(buffer).finish(),
    }
  }
}

impl From<usize> for ChanSpec {
  #[inline]
  fn from(other: usize) -> Self {
    if other == 0 {
      Self::Unbuffered
    } else {
      Self::Fixed(other)
    }
  }
}

impl From<Option<usize>> for ChanSpec {
  #[inline]
  fn from(other: Option<usize>) -> Self {
    other.map_or(Self::Unbuffered, Self::from)
  }
}

impl From<Box<dyn Buffer>> for ChanSpec {
  #[inline]
  fn from(other: Box<dyn Buffer>) -> Self {
    Self::Buffer(other)
  }
}

impl From<FixedBuffer> for ChanSpec {
  #[inline]
  fn from(other: FixedBuffer) -> Self {
    Self::Buffer(Box::new(other))
  }
}

impl From<DroppingBuffer> for ChanSpec {
  #[inline]
  fn from(other: DroppingBuffer) -> Self {
    Self::Buffer(Box::new(other))
  }
}

impl From<SlidingBuffer> for ChanSpec {
  #[inline]
  fn from(other: SlidingBuffer) -> Self {
    Self::Buffer(Box::new(other))
  }
}

/// Creates a channel. `0` means unbuffered, `n` a fixed buffer of `n`.
///
/// # Examples
///
/// ```
/// use weft::chan::buffers;
///
/// let rendezvous = weft::chan(0);
/// let queue = weft::chan(16);
/// let latest = weft::chan(buffers::sliding(1));
/// # let _ = (rendezvous, queue, latest);
/// ```
#[inline]
pub fn chan<S>(spec: S) -> Channel
where
  S: Into<ChanSpec>,
{
  Channel::new(spec.into().into_buffer())
}

/// Creates a buffered channel whose puts pass through `xform`.
///
/// # Panics
///
/// Raises [`BadArg`] if `spec` is unbuffered.
///
/// [`BadArg`]: crate::error::ExceptionGroup::BadArg
#[inline]
pub fn chan_with<S, X>(spec: S, xform: X, ex_handler: Option<ExHandler>) -> Channel
where
  S: Into<ChanSpec>,
  X: Transducer,
{
  Channel::with_transducer(spec.into().into_buffer(), xform, ex_handler)
}

// -----------------------------------------------------------------------------
// Blocking
// -----------------------------------------------------------------------------

/// Blocks the calling thread until a take from `channel` completes.
///
/// Meant for host threads outside the scheduler, such as a `main` waiting
/// for a process result.
///
/// # Panics
///
/// Raises [`SysInv`] if called from inside a task or coroutine, where
/// blocking would deadlock the scheduler.
///
/// [`SysInv`]: crate::error::ExceptionGroup::SysInv
pub fn take_blocking(channel: &Channel) -> Term {
  if dispatch::is_entered() {
    raise!(SysInv, "take_blocking called from inside the scheduler");
  }

  let signal: Arc<(Mutex<Option<Term>>, Condvar)> = Arc::new((Mutex::new(None), Condvar::new()));
  let notify: Arc<(Mutex<Option<Term>>, Condvar)> = Arc::clone(&signal);

  ops::take_async(channel, move |value: Term| {
    *notify.0.lock() = Some(value);
    notify.1.notify_one();
  });

  let mut slot: _ = signal.0.lock();

  loop {
    if let Some(value) = slot.take() {
      return value;
    }

    signal.1.wait(&mut slot);
  }
}
