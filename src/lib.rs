//! Weft - CSP processes and channels with cooperative close.
//!
//! Weft runs coroutines as lightweight processes that communicate over
//! channels. A process suspends by yielding an instruction (take, put,
//! alts, ...) and is resumed through a trampolining dispatcher once the
//! operation completes, so arbitrarily long exchanges never grow the
//! stack. Every process can be closed cooperatively: the next operation it
//! waits on is abandoned and the coroutine returns early, running its own
//! cleanup.
//!
//! # Quick Start
//!
//! ```
//! use weft::core::Term;
//!
//! let pings = weft::chan(0);
//!
//! let pong = weft::go_async({
//!   let pings = pings.clone();
//!
//!   move |co| async move {
//!     let mut count: u32 = 0;
//!
//!     while !co.take(&pings).await?.is_closed() {
//!       count += 1;
//!     }
//!
//!     Ok(Term::new(count))
//!   }
//! });
//!
//! for _ in 0..3 {
//!   weft::put_async(&pings, Term::unit(), |_| {});
//! }
//!
//! pings.close();
//!
//! assert_eq!(weft::take_blocking(&pong), Term::new(3_u32));
//! ```
//!
//! # Modules
//!
//! - [`chan`]: Channels, buffers, and transducers
//! - [`proc`]: Processes, coroutines, handlers, and instructions
//! - [`select`]: Choice over several channel operations
//! - [`dispatch`]: The task queue and its host hooks
//! - [`timer`]: Channels that close after a delay
//! - [`init`]: Runtime configuration and tracing setup
//! - [`core`]: Terms and marker values
//! - [`error`]: Misuse errors and process failures

mod facade;
mod loom;
mod utils;

pub mod chan;
pub mod consts;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod init;
pub mod proc;
pub mod select;
pub mod timer;

pub use self::chan::Channel;
pub use self::core::CLOSED;
pub use self::core::NO_VALUE;
pub use self::core::Term;
pub use self::facade::ChanSpec;
pub use self::facade::chan;
pub use self::facade::chan_with;
pub use self::facade::go;
pub use self::facade::go_async;
pub use self::facade::spawn;
pub use self::facade::take_blocking;
pub use self::proc::ops::offer;
pub use self::proc::ops::poll;
pub use self::proc::ops::put_async;
pub use self::proc::ops::put_then_callback;
pub use self::proc::ops::take_async;
pub use self::proc::ops::take_then_callback;
pub use self::select::do_alts;
pub use self::timer::timeout;
