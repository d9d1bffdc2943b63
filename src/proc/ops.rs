//! Channel operations usable outside of a coroutine, and instruction
//! constructors for use inside one.

use crate::chan::Channel;
use crate::core::Term;
use crate::proc::Callback;
use crate::proc::Completion;
use crate::proc::FnHandler;
use crate::proc::Instruction;
use crate::select::AltsOptions;
use crate::select::Operation;

// -----------------------------------------------------------------------------
// Callback Operations
// -----------------------------------------------------------------------------

/// Puts `value` onto `channel`, invoking `callback` with the outcome.
///
/// If the put completes immediately the callback runs inline; otherwise
/// it runs through the dispatcher once a taker arrives or the channel
/// closes.
pub fn put_then_callback(channel: &Channel, value: Term, callback: Option<Callback>) {
  let handler: FnHandler = FnHandler::new(true, callback);

  if let Some(completion) = channel.put(value, Box::new(handler)) {
    completion.resume();
  }
}

/// Takes from `channel`, invoking `callback` with the value.
///
/// Runs inline if a value is available now, through the dispatcher
/// otherwise.
pub fn take_then_callback(channel: &Channel, callback: Callback) {
  let handler: FnHandler = FnHandler::blocking(callback);

  if let Some(completion) = channel.take(Box::new(handler)) {
    completion.resume();
  }
}

/// Puts `value` onto `channel`; `callback` receives `true` if the value
/// was delivered and `false` if the channel was closed.
pub fn put_async<F>(channel: &Channel, value: Term, callback: F)
where
  F: FnOnce(bool) + Send + 'static,
{
  put_then_callback(
    channel,
    value,
    Some(Box::new(move |result: Term| {
      callback(result.downcast_ref::<bool>().copied().unwrap_or(false))
    })),
  );
}

/// Takes from `channel`; `callback` receives the value or [`CLOSED`].
///
/// [`CLOSED`]: crate::core::CLOSED
pub fn take_async<F>(channel: &Channel, callback: F)
where
  F: FnOnce(Term) + Send + 'static,
{
  take_then_callback(channel, Box::new(callback));
}

// -----------------------------------------------------------------------------
// Non-blocking Operations
// -----------------------------------------------------------------------------

/// Takes a value only if one is available right now.
///
/// Returns the value, [`CLOSED`] if the channel is closed and drained, or
/// [`NO_VALUE`] otherwise. Never registers a pending take.
///
/// [`CLOSED`]: crate::core::CLOSED
/// [`NO_VALUE`]: crate::core::NO_VALUE
pub fn poll(channel: &Channel) -> Term {
  let completion: Option<Completion> = channel.take(Box::new(FnHandler::non_blocking()));

  completion.map_or_else(Term::no_value, Completion::into_value)
}

/// Puts a value only if it can be accepted right now.
///
/// Returns `true` if a waiting taker or free buffer space accepted it.
/// Returns `false` if the channel is closed or nothing can accept it now.
/// Never registers a pending put.
pub fn offer(channel: &Channel, value: Term) -> bool {
  if channel.is_closed() {
    return false;
  }

  channel
    .put(value, Box::new(FnHandler::non_blocking()))
    .is_some_and(|completion| completion.value().downcast_ref::<bool>() == Some(&true))
}

// -----------------------------------------------------------------------------
// Instruction Constructors
// -----------------------------------------------------------------------------

#[inline]
pub fn take(channel: &Channel) -> Instruction {
  Instruction::Take(channel.clone())
}

#[inline]
pub fn put(channel: &Channel, value: Term) -> Instruction {
  Instruction::Put(channel.clone(), value)
}

#[inline]
pub fn alts(operations: Vec<Operation>, options: AltsOptions) -> Instruction {
  Instruction::Alts(operations, options)
}

#[inline]
pub fn take_or_return(channel: &Channel) -> Instruction {
  Instruction::TakeOrReturn(channel.clone())
}

#[inline]
pub fn prevent_close() -> Instruction {
  Instruction::PreventClose
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
