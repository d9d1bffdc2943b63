use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result;

use crate::chan::Channel;
use crate::core::Term;
use crate::proc::Awaitable;
use crate::select::AltsOptions;
use crate::select::Operation;

/// A request a coroutine yields to the process driving it.
///
/// Every channel instruction races the process's close channel unless
/// close handling is manual or the process is already unwinding.
pub enum Instruction {
  /// Take from a channel and resume with the value, possibly [`CLOSED`].
  ///
  /// [`CLOSED`]: crate::core::CLOSED
  Take(Channel),
  /// Put onto a channel and resume with `true`, or `false` if it was
  /// closed.
  Put(Channel, Term),
  /// Complete one of several operations and resume with an [`AltResult`].
  ///
  /// [`AltResult`]: crate::select::AltResult
  Alts(Vec<Operation>, AltsOptions),
  /// Like [`Take`], but forces the coroutine to return with [`CLOSED`]
  /// when the channel is closed.
  ///
  /// [`Take`]: Instruction::Take
  /// [`CLOSED`]: crate::core::CLOSED
  TakeOrReturn(Channel),
  /// Stop racing the close channel and resume with it, so the coroutine
  /// can observe close requests itself.
  PreventClose,
  /// Wait until an external value settles. Failure is thrown into the
  /// coroutine.
  Await(Box<dyn Awaitable>),
  /// Resume with this value on the next dispatcher turn.
  Value(Term),
}

impl Instruction {
  /// Returns a short name for diagnostics.
  #[inline]
  pub const fn name(&self) -> &'static str {
    match self {
      Self::Take(_) => "take",
      Self::Put(_, _) => "put",
      Self::Alts(_, _) => "alts",
      Self::TakeOrReturn(_) => "take_or_return",
      Self::PreventClose => "prevent_close",
      Self::Await(_) => "await",
      Self::Value(_) => "value",
    }
  }
}

impl From<Channel> for Instruction {
  #[inline]
  fn from(other: Channel) -> Self {
    Self::Take(other)
  }
}

impl From<Term> for Instruction {
  #[inline]
  fn from(other: Term) -> Self {
    Self::Value(other)
  }
}

impl Debug for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    match self {
      Self::Take(channel) => f.debug_tuple("Take").field(channel).finish(),
      Self::Put(channel, value) => f.debug_tuple("Put").field(channel).field(value).finish(),
      Self::Alts(operations, options) => f
        .debug_tuple("Alts")
        .field(operations)
        .field(options)
        .finish(),
      Self::TakeOrReturn(channel) => f.debug_tuple("TakeOrReturn").field(channel).finish(),
      Self::PreventClose => f.write_str("PreventClose"),
      Self::Await(_) => f.write_str("Await(..)"),
      Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
    }
  }
}
