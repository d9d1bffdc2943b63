//! Writing coroutines as `async` blocks.
//!
//! [`from_async`] hands the body a [`Co`]. Each `Co` method yields one
//! [`Instruction`] and resolves to its result once the process resumes
//! the coroutine. The future is polled only by the process, with a no-op
//! waker; awaiting anything other than a `Co` method (a tokio timer, a
//! socket) never makes progress and ends the process with an error. Use
//! [`Co::wait`] with an [`Awaitable`] to bring in external work.
//!
//! A close request or a thrown error surfaces as `Err(Interrupt)` from the
//! pending `Co` call. Propagating it with `?` finishes the process with
//! the close value, or fails it with the error.
//!
//! # Examples
//!
//! ```
//! use weft::core::Term;
//!
//! let input = weft::chan(1);
//! let output = weft::go_async({
//!   let input = input.clone();
//!
//!   move |co| async move {
//!     let value: Term = co.take(&input).await?;
//!     let value: i32 = *value.downcast_ref::<i32>().unwrap();
//!
//!     Ok(Term::new(value * 2))
//!   }
//! });
//!
//! weft::offer(&input, Term::new(21));
//! assert_eq!(weft::poll(&output), Term::new(42));
//! ```

use parking_lot::Mutex;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;
use std::task::Waker;
use triomphe::Arc;

use crate::chan::Channel;
use crate::core::Term;
use crate::proc::Awaitable;
use crate::proc::Coroutine;
use crate::proc::Instruction;
use crate::proc::Resume;
use crate::proc::Step;
use crate::select::AltResult;
use crate::select::AltsOptions;
use crate::select::Operation;

// -----------------------------------------------------------------------------
// Interrupt
// -----------------------------------------------------------------------------

/// Non-local exit delivered to a suspended `async` coroutine.
#[derive(Clone, Debug, PartialEq)]
pub enum Interrupt {
  /// The process is being closed (or a take hit a closed channel under
  /// [`Co::take_or_return`]) and should finish with this value.
  Return(Term),
  /// An error was thrown at the suspension point.
  Throw(Term),
}

impl Interrupt {
  /// Returns the carried value.
  #[inline]
  pub fn into_term(self) -> Term {
    match self {
      Self::Return(term) => term,
      Self::Throw(term) => term,
    }
  }
}

// -----------------------------------------------------------------------------
// Exchange
// -----------------------------------------------------------------------------

// Hand-off point between the suspended future and the driving process.
#[derive(Default)]
struct Exchange {
  instruction: Option<Instruction>,
  resume: Option<Resume>,
}

type Slot = Arc<Mutex<Exchange>>;

struct Suspend {
  slot: Slot,
  instruction: Option<Instruction>,
}

impl Future for Suspend {
  type Output = Resume;

  fn poll(mut self: Pin<&mut Self>, _context: &mut Context<'_>) -> Poll<Self::Output> {
    if let Some(instruction) = self.instruction.take() {
      self.slot.lock().instruction = Some(instruction);
      return Poll::Pending;
    }

    match self.slot.lock().resume.take() {
      Some(resume) => Poll::Ready(resume),
      None => Poll::Pending,
    }
  }
}

// -----------------------------------------------------------------------------
// Co
// -----------------------------------------------------------------------------

/// Instruction interface available inside an `async` coroutine.
#[derive(Clone)]
pub struct Co {
  slot: Slot,
}

impl Co {
  async fn suspend(&self, instruction: Instruction) -> ::std::result::Result<Term, Interrupt> {
    let suspend: Suspend = Suspend {
      slot: Arc::clone(&self.slot),
      instruction: Some(instruction),
    };

    match suspend.await {
      Resume::Next(value) => Ok(value),
      Resume::Throw(error) => Err(Interrupt::Throw(error)),
      Resume::Return(value) => Err(Interrupt::Return(value)),
    }
  }

  /// Takes from `channel`. Resolves to [`CLOSED`] if the channel closes.
  ///
  /// [`CLOSED`]: crate::core::CLOSED
  pub async fn take(&self, channel: &Channel) -> ::std::result::Result<Term, Interrupt> {
    self.suspend(Instruction::Take(channel.clone())).await
  }

  /// Puts onto `channel`. Resolves to `false` if the channel was closed.
  pub async fn put(&self, channel: &Channel, value: Term) -> ::std::result::Result<bool, Interrupt> {
    let result: Term = self.suspend(Instruction::Put(channel.clone(), value)).await?;
    Ok(result.downcast_ref::<bool>().copied().unwrap_or(false))
  }

  /// Completes one of `operations`.
  pub async fn alts(
    &self,
    operations: Vec<Operation>,
    options: AltsOptions,
  ) -> ::std::result::Result<AltResult, Interrupt> {
    let result: Term = self.suspend(Instruction::Alts(operations, options)).await?;

    match result.downcast::<AltResult>() {
      Ok(result) => Ok(*result),
      Err(other) => Err(Interrupt::Throw(other)),
    }
  }

  /// Takes from `channel`, returning `Err(Interrupt::Return(CLOSED))` once
  /// it is closed.
  pub async fn take_or_return(&self, channel: &Channel) -> ::std::result::Result<Term, Interrupt> {
    self.suspend(Instruction::TakeOrReturn(channel.clone())).await
  }

  /// Switches the process to manual close handling and returns its close
  /// channel.
  pub async fn prevent_close(&self) -> ::std::result::Result<Channel, Interrupt> {
    let result: Term = self.suspend(Instruction::PreventClose).await?;

    match result.downcast::<Channel>() {
      Ok(channel) => Ok(*channel),
      Err(other) => Err(Interrupt::Throw(other)),
    }
  }

  /// Waits for `awaitable` to settle. A rejection is thrown.
  pub async fn wait<A>(&self, awaitable: A) -> ::std::result::Result<Term, Interrupt>
  where
    A: Awaitable,
  {
    self.suspend(Instruction::Await(Box::new(awaitable))).await
  }

  /// Yields `value` and resumes with it on the next dispatcher turn.
  pub async fn yield_value(&self, value: Term) -> ::std::result::Result<Term, Interrupt> {
    self.suspend(Instruction::Value(value)).await
  }
}

impl Debug for Co {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.write_str("Co(..)")
  }
}

// -----------------------------------------------------------------------------
// Async Coroutine
// -----------------------------------------------------------------------------

/// A [`Coroutine`] driving an `async` body.
pub struct AsyncCoroutine<F> {
  slot: Slot,
  future: Pin<Box<F>>,
  started: bool,
}

/// Creates a coroutine from an `async` body.
pub fn from_async<F, Fut>(f: F) -> AsyncCoroutine<Fut>
where
  F: FnOnce(Co) -> Fut,
  Fut: Future<Output = ::std::result::Result<Term, Interrupt>> + Send + 'static,
{
  let slot: Slot = Slot::default();
  let co: Co = Co {
    slot: Arc::clone(&slot),
  };

  AsyncCoroutine {
    slot,
    future: Box::pin(f(co)),
    started: false,
  }
}

impl<F> Coroutine for AsyncCoroutine<F>
where
  F: Future<Output = ::std::result::Result<Term, Interrupt>> + Send + 'static,
{
  fn resume(&mut self, resume: Resume) -> ::std::result::Result<Step, Term> {
    if self.started {
      self.slot.lock().resume = Some(resume);
    } else {
      self.started = true;

      // Nothing has run yet, so there is no suspension point to unwind.
      match resume {
        Resume::Next(_) => {}
        Resume::Return(value) => return Ok(Step::Complete(value)),
        Resume::Throw(error) => return Err(error),
      }
    }

    let mut context: Context<'_> = Context::from_waker(Waker::noop());

    match self.future.as_mut().poll(&mut context) {
      Poll::Ready(Ok(value)) => Ok(Step::Complete(value)),
      Poll::Ready(Err(Interrupt::Return(value))) => Ok(Step::Complete(value)),
      Poll::Ready(Err(Interrupt::Throw(error))) => Err(error),
      Poll::Pending => match self.slot.lock().instruction.take() {
        Some(instruction) => Ok(Step::Yield(instruction)),
        None => Err(Term::new(String::from(
          "coroutine suspended on a future that is not a `Co` instruction",
        ))),
      },
    }
  }
}

impl<F> Debug for AsyncCoroutine<F> {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.debug_struct("AsyncCoroutine")
      .field("started", &self.started)
      .finish_non_exhaustive()
  }
}
