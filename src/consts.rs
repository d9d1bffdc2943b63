// -----------------------------------------------------------------------------
// Channels
// -----------------------------------------------------------------------------

/// Maximum number of pending puts or pending takes on a single channel.
///
/// Registering another blocking operation past this limit raises a
/// [`SysCap`] exception.
///
/// [`SysCap`]: crate::error::ExceptionGroup::SysCap
pub const MAX_QUEUE_SIZE: usize = 1024;

/// Number of registrations a pending queue accepts before inactive
/// handlers are purged.
pub const MAX_DIRTY: usize = 64;

// -----------------------------------------------------------------------------
// Dispatcher
// -----------------------------------------------------------------------------

/// Default number of tasks the dispatcher runs per drain.
pub const TASK_BATCH_SIZE: usize = 1024;

/// Name of the thread backing the default delayer.
pub const TIMER_THREAD_NAME: &str = "weft-timer";
