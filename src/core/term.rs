//! Type-erased values carried by channels and processes.
//!
//! Everything that flows through the scheduler (channel contents, process
//! results, close values, errors thrown into a coroutine) is a [`Term`].
//!
//! # Examples
//!
//! ```
//! use weft::core::Term;
//!
//! let term: Term = Term::new(42_i32);
//!
//! assert_eq!(term.downcast_ref::<i32>(), Some(&42));
//! assert_eq!(term.downcast_ref::<u8>(), None);
//! assert!(!term.is_closed());
//! ```

use dyn_clone::clone_box;
use std::any::Any;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

use crate::core::CLOSED;
use crate::core::Closed;
use crate::core::Item;
use crate::core::NO_VALUE;
use crate::core::NoValue;

/// Dynamically typed value that can be passed between processes.
///
/// Cloning a term deep-clones the contained value. Two terms compare equal
/// when they hold the same concrete type and the values are equal.
#[repr(transparent)]
pub struct Term {
  data: Box<dyn Item>,
}

impl Term {
  /// Creates a new term wrapping `data`.
  #[inline]
  pub fn new<T>(data: T) -> Self
  where
    T: Item,
  {
    Self {
      data: Box::new(data),
    }
  }

  /// Returns the unit term, used where a value carries no information.
  #[inline]
  pub fn unit() -> Self {
    Self::new(())
  }

  /// Returns a term holding the [`CLOSED`] marker.
  #[inline]
  pub fn closed() -> Self {
    Self::new(CLOSED)
  }

  /// Returns a term holding the [`NO_VALUE`] marker.
  #[inline]
  pub fn no_value() -> Self {
    Self::new(NO_VALUE)
  }

  /// Converts a panic payload into a term.
  ///
  /// String payloads are preserved as [`String`]; anything else becomes a
  /// generic description.
  pub fn new_error(error: Box<dyn Any + Send>) -> Self {
    match error.downcast::<String>() {
      Ok(message) => Self::new(*message),
      Err(error) => match error.downcast::<&'static str>() {
        Ok(message) => Self::new(String::from(*message)),
        Err(_) => Self::new(String::from("panic with a non-string payload")),
      },
    }
  }

  /// Returns `true` if this term is the [`CLOSED`] marker.
  #[inline]
  pub fn is_closed(&self) -> bool {
    self.is::<Closed>()
  }

  /// Returns `true` if this term is the [`NO_VALUE`] marker.
  #[inline]
  pub fn is_no_value(&self) -> bool {
    self.is::<NoValue>()
  }

  /// Returns `true` if the contained value is of type `T`.
  #[inline]
  pub fn is<T>(&self) -> bool
  where
    T: 'static,
  {
    (*self.data).as_any().is::<T>()
  }

  /// Returns a reference to the contained value if it is of type `T`.
  #[inline]
  pub fn downcast_ref<T>(&self) -> Option<&T>
  where
    T: 'static,
  {
    (*self.data).as_any().downcast_ref()
  }

  /// Returns a mutable reference to the contained value if it is of type `T`.
  #[inline]
  pub fn downcast_mut<T>(&mut self) -> Option<&mut T>
  where
    T: 'static,
  {
    (*self.data).as_mut_any().downcast_mut()
  }

  /// Extracts the contained value if it is of type `T`, otherwise returns
  /// the term unchanged.
  pub fn downcast<T>(self) -> ::std::result::Result<Box<T>, Self>
  where
    T: 'static,
  {
    if self.is::<T>() {
      let raw: *mut dyn Item = Box::into_raw(self.data);

      // SAFETY: The type check above guarantees the allocation holds a `T`.
      Ok(unsafe { Box::from_raw(raw.cast::<T>()) })
    } else {
      Err(self)
    }
  }
}

impl Clone for Term {
  #[inline]
  fn clone(&self) -> Self {
    Self {
      data: clone_box(&*self.data),
    }
  }
}

impl PartialEq for Term {
  #[inline]
  fn eq(&self, other: &Self) -> bool {
    (*self.data).dyn_eq((*other.data).as_any())
  }
}

impl Debug for Term {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Debug::fmt(&*self.data, f)
  }
}

impl Display for Term {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Debug::fmt(&*self.data, f)
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
