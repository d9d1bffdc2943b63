//! Misuse errors raised by the scheduler.
//!
//! The scheduler has two kinds of failure. Errors raised *by user code*
//! inside a coroutine are contained: the process finishes with a
//! [`Failure`] and nothing escapes into the dispatcher. Errors caused by
//! *calling the library incorrectly* (putting [`CLOSED`] on a channel,
//! an empty alts list, overflowing a pending-operation queue) panic at
//! the call site with an [`Exception`], raised through [`raise!`].
//!
//! [`CLOSED`]: crate::core::CLOSED
//! [`raise!`]: crate::raise!

mod exception;
mod failure;

pub use self::exception::Exception;
pub use self::exception::ExceptionGroup;
pub use self::failure::Failure;

// -----------------------------------------------------------------------------
// raise!
// -----------------------------------------------------------------------------

/// Panics with an [`Exception`] of the given group.
///
/// # Examples
///
/// ```
/// # use weft::raise;
/// fn capacity(value: usize) -> usize {
///   if value == 0 {
///     raise!(BadArg, "capacity must be non-zero");
///   }
///
///   value
/// }
/// # assert_eq!(capacity(1), 1);
/// ```
#[macro_export]
macro_rules! raise {
  ($group:ident, $error:expr $(,)?) => {
    ::std::panic!(
      "{}",
      $crate::error::Exception::new($crate::error::ExceptionGroup::$group, $error),
    )
  };
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
