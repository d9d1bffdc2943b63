#![cfg(loom)]

use loom::thread;

use weft::Term;
use weft::proc::AltCallbacks;
use weft::proc::AltFlag;
use weft::proc::AltHandler;
use weft::proc::Callback;
use weft::proc::Handler;

fn noop_callbacks(count: usize) -> AltCallbacks {
  AltCallbacks::new(
    (0..count)
      .map(|_| {
        let callback: Callback = Box::new(|_: Term| {});
        callback
      })
      .collect(),
  )
}

#[test]
fn claim_succeeds_once() {
  loom::model(|| {
    let flag: AltFlag = AltFlag::new();

    let threads: Vec<_> = (0..2)
      .map(|_| {
        let flag: AltFlag = flag.clone();
        thread::spawn(move || flag.claim())
      })
      .collect();

    let winners: usize = threads
      .into_iter()
      .map(|handle| handle.join().unwrap())
      .filter(|claimed| *claimed)
      .count();

    assert_eq!(winners, 1, "exactly one claim must win");
    assert!(!flag.is_active());
  });
}

#[test]
fn sibling_handlers_commit_once() {
  loom::model(|| {
    let flag: AltFlag = AltFlag::new();
    let callbacks: AltCallbacks = noop_callbacks(2);
    let take: AltHandler = AltHandler::new(flag.clone(), 0, callbacks.clone());
    let put: AltHandler = AltHandler::new(flag.clone(), 1, callbacks.clone());

    let t1 = thread::spawn(move || take.commit().is_some());
    let t2 = thread::spawn(move || put.commit().is_some());

    let first: bool = t1.join().unwrap();
    let second: bool = t2.join().unwrap();

    assert!(first ^ second, "one handler commits, the other is inactive");
    assert!(callbacks.is_empty());
  });
}

#[test]
fn committed_callback_is_taken() {
  loom::model(|| {
    let handler: AltHandler = AltHandler::new(AltFlag::new(), 0, noop_callbacks(1));

    assert!(handler.is_active());

    let callback: Option<Callback> = handler.commit();

    assert!(callback.is_some());
    assert!(!handler.is_active());
    assert!(handler.commit().is_none());
  });
}
