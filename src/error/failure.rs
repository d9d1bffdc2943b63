use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

use crate::core::Term;

/// Result value of a process that ended with an uncaught error.
///
/// When a coroutine returns an error or panics, its result channel
/// receives a `Failure` wrapping the error term instead of a normal
/// return value.
#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
  error: Term,
}

impl Failure {
  #[inline]
  pub(crate) const fn new(error: Term) -> Self {
    Self { error }
  }

  /// Returns the error that ended the process.
  #[inline]
  pub const fn error(&self) -> &Term {
    &self.error
  }

  #[inline]
  pub fn into_error(self) -> Term {
    self.error
  }
}

impl Display for Failure {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(f, "process failed: {}", self.error)
  }
}
