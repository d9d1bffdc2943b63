//! Processes and the protocol between them and their coroutines.
//!
//! A [`Process`] owns one [`Coroutine`] and a private close channel. The
//! coroutine yields [`Instruction`]s; the process turns each into a
//! channel operation guarded by [`Handler`]s, races it against the close
//! channel, and resumes the coroutine with the outcome through the
//! dispatcher.

mod awaitable;
mod co;
mod coroutine;
mod exit;
mod handler;
mod instruction;
mod process;

pub mod ops;

pub use self::awaitable::Awaitable;
pub use self::awaitable::Promise;
pub use self::awaitable::Resolver;
pub use self::awaitable::Settle;
pub use self::awaitable::spawn_future;
pub use self::co::AsyncCoroutine;
pub use self::co::Co;
pub use self::co::Interrupt;
pub use self::co::from_async;
pub use self::coroutine::Coroutine;
pub use self::coroutine::FnCoroutine;
pub use self::coroutine::Resume;
pub use self::coroutine::Step;
pub use self::coroutine::from_fn;
pub use self::exit::Exit;
pub use self::handler::AltCallbacks;
pub use self::handler::AltFlag;
pub use self::handler::AltHandler;
pub use self::handler::Callback;
pub use self::handler::Completion;
pub use self::handler::FnHandler;
pub use self::handler::Handler;
pub use self::instruction::Instruction;
pub use self::process::CloseMode;
pub use self::process::FinishFn;
pub use self::process::Process;
pub use self::process::ProcessId;
pub use self::process::ProcessState;
