use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

/// Category of a misuse error.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExceptionGroup {
  /// An argument violated the operation's preconditions.
  BadArg,
  /// A fixed limit was exceeded, such as the pending-operation cap.
  SysCap,
  /// The operation is not valid from the calling context.
  SysInv,
}

impl ExceptionGroup {
  /// Returns the short lowercase label used in messages.
  #[inline]
  pub const fn label(&self) -> &'static str {
    match self {
      Self::BadArg => "badarg",
      Self::SysCap => "syscap",
      Self::SysInv => "sysinv",
    }
  }
}

impl Display for ExceptionGroup {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.write_str(self.label())
  }
}

/// A misuse error with its group, message, and capture site.
///
/// Formats as `{group}: {message}`, for example
/// `badarg: cannot put CLOSED on a channel`.
pub struct Exception {
  group: ExceptionGroup,
  error: String,
  trace: Backtrace,
}

impl Exception {
  /// Creates a new exception, capturing a backtrace at the call site.
  #[inline]
  pub fn new<T>(group: ExceptionGroup, error: T) -> Self
  where
    T: Display,
  {
    Self {
      group,
      error: error.to_string(),
      trace: Backtrace::capture(),
    }
  }

  #[inline]
  pub const fn group(&self) -> ExceptionGroup {
    self.group
  }

  #[inline]
  pub const fn error(&self) -> &str {
    self.error.as_str()
  }

  /// Availability depends on `RUST_BACKTRACE`.
  #[inline]
  pub const fn trace(&self) -> &Backtrace {
    &self.trace
  }
}

impl Debug for Exception {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Display::fmt(self, f)
  }
}

impl Display for Exception {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(f, "{}: {}", self.group, self.error)
  }
}

impl Error for Exception {}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::error::Exception;
  use crate::error::ExceptionGroup;

  #[test]
  fn test_display() {
    let exception: Exception = Exception::new(ExceptionGroup::SysInv, "nested blocking take");

    assert_eq!(exception.to_string(), "sysinv: nested blocking take");
    assert_eq!(exception.group(), ExceptionGroup::SysInv);
    assert_eq!(exception.error(), "nested blocking take");
  }
}
