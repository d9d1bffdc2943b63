//! Channels that close after a delay.

use std::time::Duration;

use crate::chan::Channel;
use crate::dispatch;

/// Returns an unbuffered channel that closes once `duration` has elapsed.
///
/// Taking from it (directly or as one operand of an alts) therefore
/// completes with [`CLOSED`] after the delay.
///
/// [`CLOSED`]: crate::core::CLOSED
pub fn timeout(duration: Duration) -> Channel {
  let channel: Channel = Channel::unbuffered();
  let expired: Channel = channel.clone();

  tracing::trace!(channel = %channel.id(), ?duration, "timeout requested");

  dispatch::queue_delay(move || expired.close(), duration);

  channel
}
