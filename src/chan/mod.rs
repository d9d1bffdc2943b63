//! Channels, their buffers, and the transducers that feed them.

pub mod buffers;
pub mod xform;

mod channel;

pub use self::channel::Channel;
pub use self::channel::ChannelId;
