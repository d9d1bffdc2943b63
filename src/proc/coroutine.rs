//! The suspendable computation a process drives.
//!
//! A [`Coroutine`] is resumed with a [`Resume`] and answers with a
//! [`Step`]: either the next [`Instruction`] or its final value. Any
//! state machine can implement the trait directly; [`from_fn`] lifts a
//! closure, and [`from_async`] turns an `async` block into one.
//!
//! [`from_async`]: crate::proc::from_async

use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result;

use crate::core::Term;
use crate::proc::Instruction;

/// How a coroutine is resumed.
#[derive(Clone, Debug, PartialEq)]
pub enum Resume {
  /// Continue normally with the result of the last instruction.
  Next(Term),
  /// Raise an error at the suspension point.
  Throw(Term),
  /// Unwind and finish with this value, running any cleanup first.
  Return(Term),
}

impl Resume {
  #[inline]
  pub const fn is_next(&self) -> bool {
    matches!(self, Self::Next(_))
  }
}

/// What a coroutine produced when resumed.
#[derive(Debug)]
pub enum Step {
  /// Suspended on an instruction.
  Yield(Instruction),
  /// Finished with a value.
  Complete(Term),
}

/// A suspendable computation.
///
/// Returning `Err` ends the process with a failure. The first resume of a
/// fresh coroutine is always [`Resume::Next`] with a unit value.
pub trait Coroutine: Send + 'static {
  fn resume(&mut self, resume: Resume) -> ::std::result::Result<Step, Term>;
}

impl<T> Coroutine for Box<T>
where
  T: Coroutine + ?Sized,
{
  #[inline]
  fn resume(&mut self, resume: Resume) -> ::std::result::Result<Step, Term> {
    (**self).resume(resume)
  }
}

/// A coroutine backed by a closure.
pub struct FnCoroutine<F> {
  f: F,
}

impl<F> Coroutine for FnCoroutine<F>
where
  F: FnMut(Resume) -> ::std::result::Result<Step, Term> + Send + 'static,
{
  #[inline]
  fn resume(&mut self, resume: Resume) -> ::std::result::Result<Step, Term> {
    (self.f)(resume)
  }
}

impl<F> Debug for FnCoroutine<F> {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.write_str("FnCoroutine(..)")
  }
}

/// Creates a coroutine from a resume function.
///
/// # Examples
///
/// ```
/// use weft::core::Term;
/// use weft::proc::Instruction;
/// use weft::proc::Resume;
/// use weft::proc::Step;
///
/// let mut turns: u32 = 0;
///
/// let coroutine = weft::proc::from_fn(move |resume: Resume| {
///   turns += 1;
///
///   match resume {
///     Resume::Next(_) if turns < 3 => Ok(Step::Yield(Instruction::Value(Term::new(turns)))),
///     Resume::Next(value) | Resume::Return(value) => Ok(Step::Complete(value)),
///     Resume::Throw(error) => Err(error),
///   }
/// });
///
/// let result = weft::spawn(coroutine, None);
/// assert_eq!(weft::poll(&result), Term::new(2_u32));
/// ```
#[inline]
pub const fn from_fn<F>(f: F) -> FnCoroutine<F>
where
  F: FnMut(Resume) -> ::std::result::Result<Step, Term> + Send + 'static,
{
  FnCoroutine { f }
}
