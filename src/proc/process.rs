use parking_lot::Mutex;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;
use std::num::NonZeroU64;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use triomphe::Arc;

use crate::chan::Channel;
use crate::chan::buffers;
use crate::core::Term;
use crate::dispatch;
use crate::dispatch::Entered;
use crate::proc::Coroutine;
use crate::proc::Exit;
use crate::proc::Instruction;
use crate::proc::Resume;
use crate::proc::Step;
use crate::proc::ops;
use crate::raise;
use crate::select;
use crate::select::AltResult;
use crate::select::AltsOptions;
use crate::select::Operation;

static NEXT_PID: AtomicU64 = AtomicU64::new(1);

/// Callback receiving a process's exit, dispatched once.
pub type FinishFn = Box<dyn FnOnce(Exit) + Send + 'static>;

// -----------------------------------------------------------------------------
// Process Id
// -----------------------------------------------------------------------------

/// Unique identifier of a process, used in diagnostics.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProcessId(NonZeroU64);

impl ProcessId {
  #[inline]
  fn next() -> Self {
    let bits: u64 = NEXT_PID.fetch_add(1, Ordering::Relaxed);
    Self(NonZeroU64::new(bits).unwrap_or(NonZeroU64::MIN))
  }

  #[inline]
  pub const fn into_u64(self) -> u64 {
    self.0.get()
  }
}

impl Display for ProcessId {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(f, "#PID<{}>", self.0)
  }
}

// -----------------------------------------------------------------------------
// Process State
// -----------------------------------------------------------------------------

/// How a running process reacts to close requests.
///
/// Ordered by precedence: a process only ever moves to a later mode.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum CloseMode {
  /// Every channel instruction also races the close channel.
  Raced,
  /// The coroutine observes its close channel itself.
  Manual,
  /// The coroutine is running cleanup after a throw or forced return.
  Unwinding,
}

/// Lifecycle of a process.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ProcessState {
  Running(CloseMode),
  Finished,
}

impl ProcessState {
  /// Returns `true` if channel instructions must race the close channel.
  #[inline]
  pub const fn races_close(&self) -> bool {
    matches!(self, Self::Running(CloseMode::Raced))
  }

  #[inline]
  pub const fn is_finished(&self) -> bool {
    matches!(self, Self::Finished)
  }

  #[inline]
  fn escalate(&mut self, mode: CloseMode) {
    if let Self::Running(current) = self {
      *current = (*current).max(mode);
    }
  }

  // Returns `true` only for the transition into `Finished`.
  #[inline]
  fn finish(&mut self) -> bool {
    !matches!(std::mem::replace(self, Self::Finished), Self::Finished)
  }
}

// -----------------------------------------------------------------------------
// Process
// -----------------------------------------------------------------------------

/// Drives one coroutine from creation to completion.
///
/// Each yielded [`Instruction`] becomes a channel operation raced against
/// the process's private close channel, and the coroutine is resumed with
/// the outcome through the dispatcher. [`Process::close`] is the only way
/// to cancel a process: the coroutine is resumed with a forced return the
/// next time it is suspended, and may run cleanup before finishing.
#[derive(Clone)]
pub struct Process {
  inner: Arc<ProcessInner>,
}

struct ProcessInner {
  readonly: ProcReadOnly,
  internal: Mutex<ProcInternal>,
  coroutine: Mutex<Option<Box<dyn Coroutine>>>,
}

struct ProcReadOnly {
  pid: ProcessId,
  creator: Option<&'static str>,
  close_channel: Channel,
}

struct ProcInternal {
  state: ProcessState,
  on_finish: Option<FinishFn>,
}

impl Process {
  /// Creates a process. Nothing runs until the first [`Process::run`].
  pub fn new<C, F>(coroutine: C, on_finish: F, creator: Option<&'static str>) -> Self
  where
    C: Coroutine,
    F: FnOnce(Exit) + Send + 'static,
  {
    let pid: ProcessId = ProcessId::next();

    tracing::debug!(pid = %pid, creator = creator.unwrap_or("<anonymous>"), "process created");

    Self {
      inner: Arc::new(ProcessInner {
        readonly: ProcReadOnly {
          pid,
          creator,
          close_channel: Channel::with_buffer(buffers::fixed(1)),
        },
        internal: Mutex::new(ProcInternal {
          state: ProcessState::Running(CloseMode::Raced),
          on_finish: Some(Box::new(on_finish)),
        }),
        coroutine: Mutex::new(Some(Box::new(coroutine))),
      }),
    }
  }

  #[inline]
  pub fn pid(&self) -> ProcessId {
    self.inner.readonly.pid
  }

  /// Returns the label of whatever created this process.
  #[inline]
  pub fn creator(&self) -> Option<&'static str> {
    self.inner.readonly.creator
  }

  #[inline]
  pub fn state(&self) -> ProcessState {
    self.inner.internal.lock().state
  }

  #[inline]
  pub fn is_finished(&self) -> bool {
    self.state().is_finished()
  }

  /// Returns the private channel used to signal close requests.
  #[inline]
  pub fn close_channel(&self) -> &Channel {
    &self.inner.readonly.close_channel
  }

  /// Requests cooperative termination.
  ///
  /// `value` becomes the coroutine's forced return value. Closing with
  /// [`CLOSED`] closes the close channel without a value, so the forced
  /// return carries [`CLOSED`]. Only the first request is observed.
  ///
  /// [`CLOSED`]: crate::core::CLOSED
  pub fn close(&self, value: Term) {
    let _entered: Entered = dispatch::enter();

    tracing::debug!(pid = %self.pid(), "process close requested");

    if !value.is_closed() {
      ops::put_then_callback(self.close_channel(), value, None);
    }

    self.close_channel().close();
  }

  /// Resumes the coroutine once and handles what it yields.
  ///
  /// Tasks queued meanwhile, including the continuation and the finish
  /// callback, run only after this step is over, even when called from
  /// outside a drain. Does nothing once the process has finished.
  pub fn run(&self, response: Resume) {
    dispatch::deferred(|| self.advance(response));
  }

  fn advance(&self, response: Resume) {
    {
      let mut internal: _ = self.inner.internal.lock();

      if internal.state.is_finished() {
        return;
      }

      if !response.is_next() {
        internal.state.escalate(CloseMode::Unwinding);
      }
    }

    let instruction: Instruction = match self.resume(response) {
      Ok(Step::Yield(instruction)) => instruction,
      Ok(Step::Complete(value)) => return self.done(Exit::Normal(value)),
      Err(error) => {
        tracing::error!(pid = %self.pid(), %error, "process failed");
        return self.done(Exit::Failed(error));
      }
    };

    tracing::trace!(pid = %self.pid(), op = instruction.name(), "process suspended");

    match instruction {
      Instruction::Take(channel) => {
        self.alts_with_close(vec![Operation::Take(channel)], AltsOptions::new(), Mapper::Value);
      }
      Instruction::Put(channel, value) => {
        self.alts_with_close(
          vec![Operation::Put(channel, value)],
          AltsOptions::new(),
          Mapper::Value,
        );
      }
      Instruction::TakeOrReturn(channel) => {
        self.alts_with_close(
          vec![Operation::Take(channel)],
          AltsOptions::new(),
          Mapper::ReturnOnClosed,
        );
      }
      Instruction::Alts(operations, options) => {
        self.alts_with_close(operations, options, Mapper::Raw);
      }
      Instruction::PreventClose => {
        self.inner.internal.lock().state.escalate(CloseMode::Manual);
        self.continue_with(Resume::Next(Term::new(self.close_channel().clone())));
      }
      Instruction::Await(awaitable) => {
        let channel: Channel = Channel::unbuffered();
        let settled: Channel = channel.clone();

        awaitable.settle(Box::new(move |outcome| {
          ops::put_then_callback(&settled, Term::new(Settled(outcome)), None);
        }));

        self.alts_with_close(vec![Operation::Take(channel)], AltsOptions::new(), Mapper::Awaited);
      }
      Instruction::Value(value) => {
        self.continue_with(Resume::Next(value));
      }
    }
  }

  fn resume(&self, response: Resume) -> ::std::result::Result<Step, Term> {
    // Only a nested resume of this same process could already hold the lock.
    let Some(mut slot) = self.inner.coroutine.try_lock() else {
      raise!(SysInv, format_args!("process {} resumed re-entrantly", self.pid()));
    };

    let Some(coroutine) = slot.as_mut() else {
      return Err(Term::new(String::from("process resumed after completion")));
    };

    match panic::catch_unwind(AssertUnwindSafe(|| coroutine.resume(response))) {
      Ok(step) => step,
      Err(payload) => Err(Term::new_error(payload)),
    }
  }

  fn alts_with_close(&self, mut operations: Vec<Operation>, options: AltsOptions, mapper: Mapper) {
    if self.state().races_close() {
      operations.insert(0, Operation::Take(self.close_channel().clone()));
    }

    let process: Process = self.clone();

    select::do_alts(
      operations,
      move |result: AltResult| {
        let response: Resume = if result.is_from(process.close_channel()) {
          Resume::Return(result.value)
        } else {
          mapper.apply(result)
        };

        process.continue_with(response);
      },
      options,
    );
  }

  fn continue_with(&self, response: Resume) {
    let process: Process = self.clone();
    dispatch::run(move || process.run(response));
  }

  fn done(&self, exit: Exit) {
    let on_finish: Option<FinishFn> = {
      let mut internal: _ = self.inner.internal.lock();

      if !internal.state.finish() {
        return;
      }

      internal.on_finish.take()
    };

    // Dropping the coroutine releases whatever it captured.
    drop(self.inner.coroutine.lock().take());

    tracing::debug!(pid = %self.pid(), exit = %exit, "process finished");

    if let Some(on_finish) = on_finish {
      dispatch::run(move || on_finish(exit));
    }
  }
}

impl Debug for Process {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.debug_struct("Process")
      .field("pid", &self.pid())
      .field("creator", &self.creator())
      .finish_non_exhaustive()
  }
}

impl PartialEq for Process {
  #[inline]
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }
}

// -----------------------------------------------------------------------------
// Result Mapping
// -----------------------------------------------------------------------------

// Outcome of an awaitable, carried over its private channel.
#[derive(Clone, Debug, PartialEq)]
struct Settled(::std::result::Result<Term, Term>);

#[derive(Clone, Copy, Debug)]
enum Mapper {
  Value,
  ReturnOnClosed,
  Raw,
  Awaited,
}

impl Mapper {
  fn apply(self, result: AltResult) -> Resume {
    match self {
      Self::Value => Resume::Next(result.value),
      Self::ReturnOnClosed if result.value.is_closed() => Resume::Return(result.value),
      Self::ReturnOnClosed => Resume::Next(result.value),
      Self::Raw => Resume::Next(Term::new(result)),
      Self::Awaited => match result.value.downcast::<Settled>() {
        Ok(settled) => match settled.0 {
          Ok(value) => Resume::Next(value),
          Err(error) => Resume::Throw(error),
        },
        Err(value) => Resume::Next(value),
      },
    }
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
