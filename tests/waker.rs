use std::thread;
use std::time::{Duration, Instant};

use pollmux::{Selector, Waker};

mod util;

use util::{assert_send, assert_sync, init};

const TIMEOUT: Duration = Duration::from_millis(500);

#[test]
fn is_send_and_sync() {
    assert_send::<Waker>();
    assert_sync::<Waker>();
}

#[test]
fn wake_before_wait() {
    init();

    let mut selector = Selector::new().expect("unable to create selector");
    selector.wake();

    // The buffered wake byte makes an infinite wait return immediately.
    let start = Instant::now();
    assert!(selector.wait(None).unwrap());
    assert!(start.elapsed() < TIMEOUT, "blocked for {:?}", start.elapsed());

    // Fully drained: no second return.
    assert!(!selector.wait(Some(Duration::ZERO)).unwrap());
}

#[test]
fn multiple_wakeups_coalesce() {
    init();

    let mut selector = Selector::new().expect("unable to create selector");
    for _ in 0..10 {
        selector.wake();
    }

    assert!(selector.wait(Some(TIMEOUT)).unwrap());
    assert!(!selector.wait(Some(Duration::ZERO)).unwrap());
}

#[test]
fn wakeup_from_different_thread() {
    init();

    let mut selector = Selector::new().expect("unable to create selector");
    let waker = selector.waker().expect("unable to create waker");

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        waker.wake();
    });

    let start = Instant::now();
    assert!(selector.wait(None).unwrap());
    assert!(
        start.elapsed() < TIMEOUT,
        "wake took {:?}",
        start.elapsed()
    );

    handle.join().unwrap();
    assert!(!selector.wait(Some(Duration::ZERO)).unwrap());
}

#[test]
fn wakeups_from_multiple_threads() {
    init();

    let mut selector = Selector::new().expect("unable to create selector");
    let waker1 = selector.waker().expect("unable to create waker");
    let waker2 = selector.waker().expect("unable to create waker");

    let handle1 = thread::spawn(move || waker1.wake());
    let handle2 = thread::spawn(move || waker2.wake());
    handle1.join().unwrap();
    handle2.join().unwrap();

    // However many wakes were delivered, one wait consumes them all.
    assert!(selector.wait(Some(TIMEOUT)).unwrap());
    assert!(!selector.wait(Some(Duration::ZERO)).unwrap());
}
