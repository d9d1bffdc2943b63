//! Transducers applied to values entering a buffered channel.
//!
//! A [`Transducer`] sits between a put and the buffer. It may add zero,
//! one, or several values per input, and may signal [`Flow::Reduced`] to
//! close the channel once it has seen enough. A failing step returns the
//! error term, which the channel hands to its exception handler.

use crate::chan::buffers::Buffer;
use crate::core::Term;

/// Exception handler for failed transducer steps.
///
/// Returning `Some(value)` adds `value` to the buffer in place of the
/// failed input. Returning [`None`] drops it.
///
/// The handler runs after the channel lock is released and may use the
/// channel. An error raised while the same handler is already running is
/// logged and dropped.
pub type ExHandler = Box<dyn FnMut(Term) -> Option<Term> + Send + 'static>;

/// Outcome of a successful transducer step.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Flow {
  /// Keep accepting values.
  Continue,
  /// Close the channel after this step.
  Reduced,
}

/// A step function over a channel buffer.
///
/// Steps run while the channel is locked and must not use the channel
/// they belong to.
pub trait Transducer: Send + 'static {
  /// Processes one put value.
  fn step(&mut self, buffer: &mut dyn Buffer, value: Term) -> Result<Flow, Term>;

  /// Called once when the channel closes.
  #[inline]
  fn complete(&mut self, buffer: &mut dyn Buffer) {
    let _ = buffer;
  }
}

impl<T> Transducer for Box<T>
where
  T: Transducer + ?Sized,
{
  #[inline]
  fn step(&mut self, buffer: &mut dyn Buffer, value: Term) -> Result<Flow, Term> {
    (**self).step(buffer, value)
  }

  #[inline]
  fn complete(&mut self, buffer: &mut dyn Buffer) {
    (**self).complete(buffer)
  }
}

/// Default exception handler: logs the error and drops the value.
pub(crate) fn default_ex_handler() -> ExHandler {
  Box::new(|error: Term| {
    tracing::error!(%error, "transducer step failed");
    None
  })
}

// -----------------------------------------------------------------------------
// Identity
// -----------------------------------------------------------------------------

/// Adds every value to the buffer unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl Transducer for Identity {
  #[inline]
  fn step(&mut self, buffer: &mut dyn Buffer, value: Term) -> Result<Flow, Term> {
    buffer.add(value);
    Ok(Flow::Continue)
  }
}

// -----------------------------------------------------------------------------
// Map
// -----------------------------------------------------------------------------

/// Applies a fallible function to each value.
pub struct Map<F> {
  f: F,
}

impl<F> Transducer for Map<F>
where
  F: FnMut(Term) -> Result<Term, Term> + Send + 'static,
{
  #[inline]
  fn step(&mut self, buffer: &mut dyn Buffer, value: Term) -> Result<Flow, Term> {
    buffer.add((self.f)(value)?);
    Ok(Flow::Continue)
  }
}

/// Transforms each value with `f`.
#[inline]
pub fn map<F>(mut f: F) -> Map<impl FnMut(Term) -> Result<Term, Term> + Send + 'static>
where
  F: FnMut(Term) -> Term + Send + 'static,
{
  Map {
    f: move |value| Ok(f(value)),
  }
}

/// Transforms each value with `f`, routing errors to the exception handler.
#[inline]
pub fn try_map<F>(f: F) -> Map<F>
where
  F: FnMut(Term) -> Result<Term, Term> + Send + 'static,
{
  Map { f }
}

// -----------------------------------------------------------------------------
// Filter
// -----------------------------------------------------------------------------

/// Keeps only values matching a predicate.
pub struct Filter<F> {
  f: F,
}

impl<F> Transducer for Filter<F>
where
  F: FnMut(&Term) -> bool + Send + 'static,
{
  #[inline]
  fn step(&mut self, buffer: &mut dyn Buffer, value: Term) -> Result<Flow, Term> {
    if (self.f)(&value) {
      buffer.add(value);
    }

    Ok(Flow::Continue)
  }
}

#[inline]
pub fn filter<F>(f: F) -> Filter<F>
where
  F: FnMut(&Term) -> bool + Send + 'static,
{
  Filter { f }
}

// -----------------------------------------------------------------------------
// Take
// -----------------------------------------------------------------------------

/// Accepts `count` values, then closes the channel.
#[derive(Clone, Copy, Debug)]
pub struct Take {
  remaining: usize,
}

impl Transducer for Take {
  fn step(&mut self, buffer: &mut dyn Buffer, value: Term) -> Result<Flow, Term> {
    if self.remaining == 0 {
      return Ok(Flow::Reduced);
    }

    buffer.add(value);
    self.remaining -= 1;

    if self.remaining == 0 {
      Ok(Flow::Reduced)
    } else {
      Ok(Flow::Continue)
    }
  }
}

#[inline]
pub const fn take(count: usize) -> Take {
  Take { remaining: count }
}

// -----------------------------------------------------------------------------
// Compose
// -----------------------------------------------------------------------------

/// Runs `outer` on each value, then feeds what it emits into `inner`.
pub struct Compose<A, B> {
  outer: A,
  inner: B,
}

/// Chains two transducers, `outer` applied first.
#[inline]
pub fn compose<A, B>(outer: A, inner: B) -> Compose<A, B>
where
  A: Transducer,
  B: Transducer,
{
  Compose { outer, inner }
}

// Collects what the outer stage emits so the inner stage can run on it.
#[derive(Debug, Default)]
struct Staging {
  items: Vec<Term>,
}

impl Buffer for Staging {
  fn is_full(&self) -> bool {
    false
  }

  fn remove(&mut self) -> Option<Term> {
    if self.items.is_empty() {
      None
    } else {
      Some(self.items.remove(0))
    }
  }

  fn add(&mut self, value: Term) {
    self.items.push(value);
  }

  fn count(&self) -> usize {
    self.items.len()
  }
}

impl<A, B> Compose<A, B>
where
  A: Transducer,
  B: Transducer,
{
  fn forward(&mut self, buffer: &mut dyn Buffer, staging: Staging) -> Result<Flow, Term> {
    for value in staging.items {
      if self.inner.step(buffer, value)? == Flow::Reduced {
        return Ok(Flow::Reduced);
      }
    }

    Ok(Flow::Continue)
  }
}

impl<A, B> Transducer for Compose<A, B>
where
  A: Transducer,
  B: Transducer,
{
  fn step(&mut self, buffer: &mut dyn Buffer, value: Term) -> Result<Flow, Term> {
    let mut staging: Staging = Staging::default();
    let outer: Flow = self.outer.step(&mut staging, value)?;
    let inner: Flow = self.forward(buffer, staging)?;

    if outer == Flow::Reduced || inner == Flow::Reduced {
      Ok(Flow::Reduced)
    } else {
      Ok(Flow::Continue)
    }
  }

  fn complete(&mut self, buffer: &mut dyn Buffer) {
    let mut staging: Staging = Staging::default();

    self.outer.complete(&mut staging);

    if let Err(error) = self.forward(buffer, staging) {
      tracing::error!(%error, "transducer completion failed");
    }

    self.inner.complete(buffer);
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::chan::buffers;
  use crate::chan::buffers::Buffer;
  use crate::chan::xform;
  use crate::chan::xform::Flow;
  use crate::chan::xform::Transducer;
  use crate::core::Term;

  fn int(term: &Term) -> i32 {
    *term.downcast_ref::<i32>().unwrap()
  }

  #[test]
  fn test_map_and_filter_composed() {
    let mut buffer: _ = buffers::fixed(8);
    let mut xform: _ = xform::compose(
      xform::map(|term| Term::new(int(&term) * 10)),
      xform::filter(|term| int(term) > 10),
    );

    for value in 1..=3 {
      assert_eq!(xform.step(&mut buffer, Term::new(value)), Ok(Flow::Continue));
    }

    assert_eq!(buffer.count(), 2);
    assert_eq!(buffer.remove().map(|term| int(&term)), Some(20));
    assert_eq!(buffer.remove().map(|term| int(&term)), Some(30));
  }

  #[test]
  fn test_take_reduces() {
    let mut buffer: _ = buffers::fixed(8);
    let mut xform: _ = xform::take(2);

    assert_eq!(xform.step(&mut buffer, Term::new(1)), Ok(Flow::Continue));
    assert_eq!(xform.step(&mut buffer, Term::new(2)), Ok(Flow::Reduced));
    assert_eq!(buffer.count(), 2);
  }

  #[test]
  fn test_try_map_propagates_error() {
    let mut buffer: _ = buffers::fixed(1);
    let mut xform: _ = xform::try_map(|_| Err(Term::new("nope")));

    assert_eq!(xform.step(&mut buffer, Term::unit()), Err(Term::new("nope")));
    assert_eq!(buffer.count(), 0);
  }
}
