//! Default delayer backed by a dedicated timer thread.

use std::sync::LazyLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use tokio::runtime::Builder;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;

use crate::consts::TIMER_THREAD_NAME;
use crate::core::fatal;
use crate::dispatch::Task;

static SERVICE: LazyLock<TimerService> = LazyLock::new(TimerService::start);

/// Single-threaded tokio runtime that sleeps on behalf of delayed tasks.
///
/// Started lazily the first time a delay is requested with no custom
/// delayer installed. The thread lives for the remainder of the program.
pub(crate) struct TimerService {
  handle: Handle,
  slots: AtomicU64,
}

impl TimerService {
  #[inline]
  pub(crate) fn global() -> &'static Self {
    &SERVICE
  }

  fn start() -> Self {
    let runtime: Runtime = match Builder::new_current_thread().enable_time().build() {
      Ok(runtime) => runtime,
      Err(error) => fatal!(format_args!("failed to build timer runtime: {error}")),
    };

    let handle: Handle = runtime.handle().clone();

    let spawned: _ = thread::Builder::new()
      .name(TIMER_THREAD_NAME.to_owned())
      .spawn(move || runtime.block_on(std::future::pending::<()>()));

    if let Err(error) = spawned {
      fatal!(format_args!("failed to spawn timer thread: {error}"));
    }

    tracing::debug!(thread = TIMER_THREAD_NAME, "timer service started");

    Self {
      handle,
      slots: AtomicU64::new(1),
    }
  }

  /// Runs `task` on the timer thread once `delay` has elapsed.
  pub(crate) fn schedule(&self, task: Task, delay: Duration) {
    let slot: u64 = self.slots.fetch_add(1, Ordering::Relaxed);

    tracing::trace!(slot, ?delay, "timer armed");

    self.handle.spawn(async move {
      tokio::time::sleep(delay).await;
      tracing::trace!(slot, "timer fired");
      task();
    });
  }
}
