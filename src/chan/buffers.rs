//! Channel buffers.
//!
//! A buffer decides what happens to values that arrive while no taker is
//! waiting. [`FixedBuffer`] holds up to its capacity and then makes
//! putters wait. [`DroppingBuffer`] and [`SlidingBuffer`] never report
//! full: once at capacity they discard the newest or the oldest value.

use std::collections::VecDeque;
use std::fmt::Debug;

use crate::core::Term;
use crate::raise;

/// Storage for values waiting in a channel.
pub trait Buffer: Debug + Send + 'static {
  /// Returns `true` if a put must wait instead of being buffered.
  fn is_full(&self) -> bool;

  /// Removes and returns the oldest value.
  fn remove(&mut self) -> Option<Term>;

  /// Adds a value, applying the buffer's overflow policy.
  fn add(&mut self, value: Term);

  /// Returns the number of buffered values.
  fn count(&self) -> usize;
}

/// Creates a buffer holding up to `capacity` values.
///
/// A capacity of zero is valid and always full.
#[inline]
pub fn fixed(capacity: usize) -> FixedBuffer {
  FixedBuffer {
    items: VecDeque::with_capacity(capacity),
    capacity,
  }
}

/// Creates a buffer that silently drops new values once full.
///
/// # Panics
///
/// Raises [`BadArg`] if `capacity` is zero.
///
/// [`BadArg`]: crate::error::ExceptionGroup::BadArg
#[inline]
pub fn dropping(capacity: usize) -> DroppingBuffer {
  if capacity == 0 {
    raise!(BadArg, "dropping buffer capacity must be non-zero");
  }

  DroppingBuffer {
    items: VecDeque::with_capacity(capacity),
    capacity,
  }
}

/// Creates a buffer that evicts its oldest value to make room once full.
///
/// # Panics
///
/// Raises [`BadArg`] if `capacity` is zero.
///
/// [`BadArg`]: crate::error::ExceptionGroup::BadArg
#[inline]
pub fn sliding(capacity: usize) -> SlidingBuffer {
  if capacity == 0 {
    raise!(BadArg, "sliding buffer capacity must be non-zero");
  }

  SlidingBuffer {
    items: VecDeque::with_capacity(capacity),
    capacity,
  }
}

// -----------------------------------------------------------------------------
// Fixed
// -----------------------------------------------------------------------------

#[derive(Debug)]
pub struct FixedBuffer {
  items: VecDeque<Term>,
  capacity: usize,
}

impl Buffer for FixedBuffer {
  #[inline]
  fn is_full(&self) -> bool {
    self.items.len() >= self.capacity
  }

  #[inline]
  fn remove(&mut self) -> Option<Term> {
    self.items.pop_front()
  }

  // Transducers may push several values for one put, so this does not
  // enforce the capacity. Only `is_full` gates new puts.
  #[inline]
  fn add(&mut self, value: Term) {
    self.items.push_back(value);
  }

  #[inline]
  fn count(&self) -> usize {
    self.items.len()
  }
}

// -----------------------------------------------------------------------------
// Dropping
// -----------------------------------------------------------------------------

#[derive(Debug)]
pub struct DroppingBuffer {
  items: VecDeque<Term>,
  capacity: usize,
}

impl Buffer for DroppingBuffer {
  #[inline]
  fn is_full(&self) -> bool {
    false
  }

  #[inline]
  fn remove(&mut self) -> Option<Term> {
    self.items.pop_front()
  }

  #[inline]
  fn add(&mut self, value: Term) {
    if self.items.len() < self.capacity {
      self.items.push_back(value);
    }
  }

  #[inline]
  fn count(&self) -> usize {
    self.items.len()
  }
}

// -----------------------------------------------------------------------------
// Sliding
// -----------------------------------------------------------------------------

#[derive(Debug)]
pub struct SlidingBuffer {
  items: VecDeque<Term>,
  capacity: usize,
}

impl Buffer for SlidingBuffer {
  #[inline]
  fn is_full(&self) -> bool {
    false
  }

  #[inline]
  fn remove(&mut self) -> Option<Term> {
    self.items.pop_front()
  }

  #[inline]
  fn add(&mut self, value: Term) {
    if self.items.len() == self.capacity {
      self.items.pop_front();
    }

    self.items.push_back(value);
  }

  #[inline]
  fn count(&self) -> usize {
    self.items.len()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
