use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

use crate::core::Term;

/// How a process finished.
#[derive(Clone, PartialEq)]
pub enum Exit {
  /// The coroutine completed with a value, including a forced return
  /// after close.
  Normal(Term),
  /// The coroutine returned an error or panicked.
  Failed(Term),
}

impl Exit {
  #[inline]
  pub const fn is_normal(&self) -> bool {
    matches!(self, Self::Normal(_))
  }

  #[inline]
  pub const fn is_failed(&self) -> bool {
    matches!(self, Self::Failed(_))
  }

  /// Returns the final value or error.
  #[inline]
  pub fn into_term(self) -> Term {
    match self {
      Self::Normal(term) => term,
      Self::Failed(term) => term,
    }
  }
}

impl Debug for Exit {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    match self {
      Self::Normal(inner) => f.debug_tuple("Normal").field(inner).finish(),
      Self::Failed(inner) => f.debug_tuple("Failed").field(inner).finish(),
    }
  }
}

impl Display for Exit {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    match self {
      Self::Normal(inner) => Display::fmt(inner, f),
      Self::Failed(inner) => write!(f, "failed: {inner}"),
    }
  }
}
