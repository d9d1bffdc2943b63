//! The dispatcher: a FIFO task queue drained by a trampoline.
//!
//! Every resumption of a process and every channel wakeup becomes a
//! [`Task`] on this queue. By default a drain starts inline the first
//! time a task is queued from outside a drain, and tasks queued *during*
//! a drain only append to the queue. The call stack therefore stays
//! bounded no matter how many times processes hand control back and
//! forth.
//!
//! Hosts that own an event loop can take over scheduling with
//! [`set_queue_dispatcher`]: the hook receives a [`Drain`] token and runs
//! it whenever convenient. Delayed tasks go through [`queue_delay`], which
//! uses a timer thread unless [`set_queue_delayer`] installs a different
//! source of time.

mod scheduler;
mod timer;

use parking_lot::Mutex;
use parking_lot::RwLock;
use parking_lot::const_mutex;
use parking_lot::const_rwlock;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::consts::TASK_BATCH_SIZE;
use crate::raise;
use crate::utils::measure_fn;

pub(crate) use self::scheduler::Entered;
pub(crate) use self::scheduler::enter;
pub(crate) use self::scheduler::is_entered;

use self::timer::TimerService;

/// A unit of work queued on the dispatcher.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

type DispatchHook = Arc<dyn Fn(Drain) + Send + Sync + 'static>;
type DelayHook = Arc<dyn Fn(Task, Duration) + Send + Sync + 'static>;

static QUEUE: Mutex<TaskQueue> = const_mutex(TaskQueue::new());
static BATCH_SIZE: AtomicUsize = AtomicUsize::new(TASK_BATCH_SIZE);
static DISPATCH_HOOK: RwLock<Option<DispatchHook>> = const_rwlock(None);
static DELAY_HOOK: RwLock<Option<DelayHook>> = const_rwlock(None);

// -----------------------------------------------------------------------------
// Task Queue
// -----------------------------------------------------------------------------

struct TaskQueue {
  tasks: VecDeque<Task>,
  running: bool,
  queued: bool,
}

impl TaskQueue {
  const fn new() -> Self {
    Self {
      tasks: VecDeque::new(),
      running: false,
      queued: false,
    }
  }
}

// Clears the running flag even if a task unwinds.
struct RunningGuard;

impl Drop for RunningGuard {
  #[inline]
  fn drop(&mut self) {
    QUEUE.lock().running = false;
  }
}

// -----------------------------------------------------------------------------
// Drain
// -----------------------------------------------------------------------------

/// Permission to drain one batch of the dispatcher queue.
///
/// Handed to the hook installed by [`set_queue_dispatcher`].
pub struct Drain {
  _marker: (),
}

impl Drain {
  /// Runs up to one batch of queued tasks.
  ///
  /// If tasks remain afterwards, another drain is scheduled through the
  /// active hook.
  pub fn run(self) {
    if drain_batch() {
      schedule();
    }
  }
}

impl Debug for Drain {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.write_str("Drain(..)")
  }
}

// -----------------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------------

/// Queues `task` for execution in FIFO order.
///
/// With the default hook the queue is drained before this returns, unless
/// a drain is already in progress further up the stack.
pub fn run<F>(task: F)
where
  F: FnOnce() + Send + 'static,
{
  let _entered: Entered = enter();

  QUEUE.lock().tasks.push_back(Box::new(task));

  schedule();
}

/// Queues `task` once `delay` has elapsed.
///
/// The task runs through [`run`], so it observes the same ordering and
/// trampolining as any other task.
pub fn queue_delay<F>(task: F, delay: Duration)
where
  F: FnOnce() + Send + 'static,
{
  let task: Task = Box::new(move || run(task));
  let hook: Option<DelayHook> = DELAY_HOOK.read().clone();

  match hook {
    Some(hook) => hook(task, delay),
    None => TimerService::global().schedule(task, delay),
  }
}

/// Replaces how queue drains are scheduled.
///
/// The hook is invoked at most once per pending drain. It must eventually
/// call [`Drain::run`] or queued tasks never execute.
pub fn set_queue_dispatcher<F>(hook: F)
where
  F: Fn(Drain) + Send + Sync + 'static,
{
  *DISPATCH_HOOK.write() = Some(Arc::new(hook));
}

/// Restores inline draining.
pub fn reset_queue_dispatcher() {
  *DISPATCH_HOOK.write() = None;
}

/// Replaces the source of delayed execution used by [`queue_delay`].
///
/// The hook receives a task that must be invoked once, after the given
/// delay, from any thread.
pub fn set_queue_delayer<F>(hook: F)
where
  F: Fn(Task, Duration) + Send + Sync + 'static,
{
  *DELAY_HOOK.write() = Some(Arc::new(hook));
}

/// Restores the timer thread as the source of delayed execution.
pub fn reset_queue_delayer() {
  *DELAY_HOOK.write() = None;
}

/// Sets the maximum number of tasks run per drain.
///
/// # Panics
///
/// Raises [`BadArg`] if `size` is zero.
///
/// [`BadArg`]: crate::error::ExceptionGroup::BadArg
pub fn set_batch_size(size: usize) {
  if size == 0 {
    raise!(BadArg, "dispatcher batch size must be non-zero");
  }

  BATCH_SIZE.store(size, Ordering::Relaxed);
}

/// Returns the number of tasks waiting in the queue.
pub fn pending() -> usize {
  QUEUE.lock().tasks.len()
}

/// Runs `f` as if it were a queued task.
///
/// Tasks queued by `f` wait until it returns. Outside a drain they are
/// then scheduled as usual; inside one they stay behind the current task.
pub(crate) fn deferred<F, R>(f: F) -> R
where
  F: FnOnce() -> R,
{
  let _entered: Entered = enter();

  let guard: Option<RunningGuard> = {
    let mut queue: _ = QUEUE.lock();

    if queue.running {
      None
    } else {
      queue.running = true;
      Some(RunningGuard)
    }
  };

  let Some(guard) = guard else {
    return f();
  };

  let output: R = f();

  drop(guard);

  if !QUEUE.lock().tasks.is_empty() {
    schedule();
  }

  output
}

// -----------------------------------------------------------------------------
// Internals
// -----------------------------------------------------------------------------

fn schedule() {
  // Whoever holds the running flag picks up what is left.
  if QUEUE.lock().running {
    return;
  }

  let hook: Option<DispatchHook> = DISPATCH_HOOK.read().clone();

  let Some(hook) = hook else {
    while drain_batch() {}
    return;
  };

  {
    let mut queue: _ = QUEUE.lock();

    if queue.queued {
      return;
    }

    queue.queued = true;
  }

  hook(Drain { _marker: () });
}

// Runs one batch. Returns `true` if this call drained and tasks remain.
fn drain_batch() -> bool {
  let _entered: Entered = enter();

  {
    let mut queue: _ = QUEUE.lock();

    if queue.running {
      return false;
    }

    queue.running = true;
    queue.queued = false;
  }

  let guard: RunningGuard = RunningGuard;
  let limit: usize = BATCH_SIZE.load(Ordering::Relaxed);

  let (count, elapsed): (usize, Duration) = measure_fn(|| {
    let mut count: usize = 0;

    while count < limit {
      // The queue lock is released before the task runs.
      let next: Option<Task> = QUEUE.lock().tasks.pop_front();

      let Some(task) = next else {
        break;
      };

      task();
      count += 1;
    }

    count
  });

  drop(guard);

  tracing::trace!(count, ?elapsed, "dispatcher batch drained");

  !QUEUE.lock().tasks.is_empty()
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use parking_lot::Mutex;
  use std::sync::Arc;

  use crate::dispatch;

  #[test]
  fn test_tasks_run_in_fifo_order() {
    let trace: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let outer: Arc<Mutex<Vec<u32>>> = Arc::clone(&trace);

    dispatch::run(move || {
      let first: Arc<Mutex<Vec<u32>>> = Arc::clone(&outer);
      let second: Arc<Mutex<Vec<u32>>> = Arc::clone(&outer);

      dispatch::run(move || first.lock().push(2));
      dispatch::run(move || second.lock().push(3));

      // Nested tasks are queued behind the current one.
      outer.lock().push(1);
    });

    assert_eq!(*trace.lock(), vec![1, 2, 3]);
  }

  #[test]
  fn test_deep_chain_does_not_grow_stack() {
    fn bounce(remaining: usize, done: Arc<Mutex<usize>>) {
      if remaining == 0 {
        *done.lock() += 1;
      } else {
        dispatch::run(move || bounce(remaining - 1, done));
      }
    }

    let done: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));

    bounce(200_000, Arc::clone(&done));

    assert_eq!(*done.lock(), 1);
  }

  #[test]
  fn test_deferred_holds_tasks_until_it_returns() {
    let trace: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let inner: Arc<Mutex<Vec<&'static str>>> = Arc::clone(&trace);

    let output: u32 = dispatch::deferred(|| {
      dispatch::run(move || inner.lock().push("task"));
      trace.lock().push("body");
      7
    });

    assert_eq!(output, 7);
    assert_eq!(*trace.lock(), vec!["body", "task"]);
  }
}
