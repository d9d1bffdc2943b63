use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use weft::Channel;
use weft::Term;
use weft::dispatch;
use weft::dispatch::Drain;
use weft::dispatch::Task;
use weft::proc::Exit;
use weft::proc::Process;
use weft::proc::Resume;
use weft::proc::Step;

// Hooks are process-wide; tests in this binary take turns.
static SERIAL: Mutex<()> = Mutex::new(());

type Drains = Arc<Mutex<Vec<Drain>>>;

fn install_deferred_dispatcher() -> Drains {
  let drains: Drains = Arc::default();
  let stash: Drains = Arc::clone(&drains);

  dispatch::set_queue_dispatcher(move |drain: Drain| stash.lock().push(drain));

  drains
}

fn run_deferred(drains: &Drains) -> usize {
  let mut count: usize = 0;

  loop {
    let next: Option<Drain> = drains.lock().pop();

    let Some(drain) = next else {
      break count;
    };

    drain.run();
    count += 1;
  }
}

#[test]
fn test_custom_dispatcher_defers_tasks() {
  let _serial: _ = SERIAL.lock();
  let drains: Drains = install_deferred_dispatcher();
  let counter: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));

  for _ in 0..3 {
    let counter: Arc<AtomicUsize> = Arc::clone(&counter);
    dispatch::run(move || {
      counter.fetch_add(1, Ordering::SeqCst);
    });
  }

  // One drain is requested for the whole backlog.
  assert_eq!(drains.lock().len(), 1);
  assert_eq!(dispatch::pending(), 3);
  assert_eq!(counter.load(Ordering::SeqCst), 0);

  assert!(run_deferred(&drains) >= 1);
  assert_eq!(counter.load(Ordering::SeqCst), 3);
  assert_eq!(dispatch::pending(), 0);

  dispatch::reset_queue_dispatcher();
}

#[test]
fn test_custom_dispatcher_drives_processes() {
  let _serial: _ = SERIAL.lock();
  let drains: Drains = install_deferred_dispatcher();

  let result: Channel = weft::go_async(|co| async move {
    let value: Term = co.yield_value(Term::new(7_i64)).await?;
    Ok(value)
  });

  assert!(weft::poll(&result).is_no_value());
  assert_eq!(dispatch::pending(), 1);

  run_deferred(&drains);

  assert_eq!(weft::poll(&result), Term::new(7_i64));

  dispatch::reset_queue_dispatcher();
}

#[test]
fn test_finish_waits_for_custom_dispatcher() {
  let _serial: _ = SERIAL.lock();
  let drains: Drains = install_deferred_dispatcher();
  let order: Arc<Mutex<Vec<&'static str>>> = Arc::default();
  let finished: Arc<Mutex<Vec<&'static str>>> = Arc::clone(&order);

  let process: Process = Process::new(
    weft::proc::from_fn(|_resume: Resume| Ok(Step::Complete(Term::unit()))),
    move |_exit: Exit| finished.lock().push("finish"),
    None,
  );

  process.run(Resume::Next(Term::unit()));
  order.lock().push("run returned");

  assert!(process.is_finished());
  assert_eq!(run_deferred(&drains), 1);
  assert_eq!(*order.lock(), vec!["run returned", "finish"]);

  dispatch::reset_queue_dispatcher();
}

#[test]
fn test_batch_size_splits_drains() {
  let _serial: _ = SERIAL.lock();
  let drains: Drains = install_deferred_dispatcher();

  dispatch::set_batch_size(2);

  for _ in 0..5 {
    dispatch::run(|| {});
  }

  // 5 tasks in batches of 2.
  assert_eq!(run_deferred(&drains), 3);
  assert_eq!(dispatch::pending(), 0);

  dispatch::set_batch_size(weft::consts::TASK_BATCH_SIZE);
  dispatch::reset_queue_dispatcher();
}

#[test]
fn test_custom_delayer_controls_timeouts() {
  let _serial: _ = SERIAL.lock();
  let delayed: Arc<Mutex<Vec<(Task, Duration)>>> = Arc::default();
  let stash: Arc<Mutex<Vec<(Task, Duration)>>> = Arc::clone(&delayed);

  dispatch::set_queue_delayer(move |task: Task, delay: Duration| stash.lock().push((task, delay)));

  let timeout: Channel = weft::timeout(Duration::from_secs(3600));

  assert!(weft::poll(&timeout).is_no_value());

  let (task, delay): (Task, Duration) = delayed.lock().pop().expect("delayed task");

  assert_eq!(delay, Duration::from_secs(3600));

  task();

  assert!(timeout.is_closed());
  assert!(weft::poll(&timeout).is_closed());

  dispatch::reset_queue_delayer();
}

#[test]
fn test_reset_restores_inline_draining() {
  let _serial: _ = SERIAL.lock();
  let _drains: Drains = install_deferred_dispatcher();

  dispatch::reset_queue_dispatcher();

  let counter: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
  let inner: Arc<AtomicUsize> = Arc::clone(&counter);

  dispatch::run(move || {
    inner.fetch_add(1, Ordering::SeqCst);
  });

  assert_eq!(counter.load(Ordering::SeqCst), 1);
}
