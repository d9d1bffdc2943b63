//! Core value types shared by channels, handlers, and processes.

mod item;
mod macros;
mod sentinel;
mod term;

pub(crate) use self::macros::fatal;

pub use self::item::Item;
pub use self::sentinel::CLOSED;
pub use self::sentinel::Closed;
pub use self::sentinel::NO_VALUE;
pub use self::sentinel::NoValue;
pub use self::term::Term;
