//! Distinguished marker values.
//!
//! [`CLOSED`] is what a take observes once a channel is closed and
//! drained. [`NO_VALUE`] is what [`poll`] returns when nothing is
//! available right now. Neither can be confused with user data: the
//! marker types have private fields, so user code can only obtain the
//! constants below, and putting [`CLOSED`] onto a channel is rejected.
//!
//! [`poll`]: crate::poll

use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

/// Marker delivered to takers of a closed, drained channel.
#[derive(Clone, Copy, Hash, PartialEq, Eq)]
pub struct Closed {
  _marker: (),
}

/// Marker returned by a non-blocking take that found nothing.
#[derive(Clone, Copy, Hash, PartialEq, Eq)]
pub struct NoValue {
  _marker: (),
}

/// The closed marker.
pub const CLOSED: Closed = Closed { _marker: () };

/// The no-value marker.
pub const NO_VALUE: NoValue = NoValue { _marker: () };

impl Debug for Closed {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.write_str("CLOSED")
  }
}

impl Display for Closed {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Debug::fmt(self, f)
  }
}

impl Debug for NoValue {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.write_str("NO_VALUE")
  }
}

impl Display for NoValue {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Debug::fmt(self, f)
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
