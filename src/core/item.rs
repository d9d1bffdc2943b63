use dyn_clone::DynClone;
use std::any::Any;
use std::fmt::Debug;

/// Trait implemented by every value a [`Term`] can carry.
///
/// Implemented automatically for any `'static` type that is [`Clone`],
/// [`Debug`], [`PartialEq`], [`Send`], and [`Sync`]. Channels themselves
/// satisfy these bounds, so a channel can be sent over another channel.
///
/// [`Term`]: crate::core::Term
pub trait Item: Any + Debug + DynClone + Send + Sync + 'static {
  /// Returns a shared reference to this value as [`Any`].
  fn as_any(&self) -> &(dyn Any + Send + Sync);

  /// Returns a mutable reference to this value as [`Any`].
  fn as_mut_any(&mut self) -> &mut (dyn Any + Send + Sync);

  /// Compares against a value of unknown type.
  ///
  /// Values of different concrete types are never equal.
  fn dyn_eq(&self, other: &(dyn Any + Send + Sync)) -> bool;
}

impl<T> Item for T
where
  T: Any + Debug + Clone + PartialEq + Send + Sync + 'static,
{
  #[inline]
  fn as_any(&self) -> &(dyn Any + Send + Sync) {
    self
  }

  #[inline]
  fn as_mut_any(&mut self) -> &mut (dyn Any + Send + Sync) {
    self
  }

  #[inline]
  fn dyn_eq(&self, other: &(dyn Any + Send + Sync)) -> bool {
    other
      .downcast_ref::<T>()
      .is_some_and(|other| PartialEq::eq(self, other))
  }
}
