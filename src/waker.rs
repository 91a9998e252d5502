use std::fs::File;

use crate::wake;

/// Cross-thread handle waking a [`Selector`] blocked in [`wait`].
///
/// The selector itself holds `Rc`/`RefCell` state and is deliberately not
/// `Sync`; a `Waker` owns a duplicate of the wake pipe's write end and is
/// the one way to reach a selector from another thread. Create one with
/// [`Selector::waker`] before handing work to other threads.
///
/// A wake delivered before the wait makes that wait return immediately; a
/// wake delivered during the wait makes it return no later than one
/// `poll(2)` cycle later. Multiple wakes coalesce into a single return.
///
/// [`Selector`]: crate::Selector
/// [`wait`]: crate::Selector::wait
/// [`Selector::waker`]: crate::Selector::waker
///
/// # Examples
///
/// ```
/// use std::thread;
/// use std::time::Duration;
///
/// use pollmux::Selector;
///
/// # fn main() -> std::io::Result<()> {
/// let mut selector = Selector::new()?;
/// let waker = selector.waker()?;
///
/// let handle = thread::spawn(move || {
///     thread::sleep(Duration::from_millis(10));
///     waker.wake();
/// });
///
/// // Blocks until the other thread wakes us.
/// assert!(selector.wait(None)?);
/// handle.join().unwrap();
/// #     Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Waker {
    sender: File,
}

impl Waker {
    pub(crate) fn new(sender: File) -> Waker {
        Waker { sender }
    }

    /// Wake the selector.
    ///
    /// Write failures are ignored: a full pipe means a wake is already
    /// pending, and a torn-down selector no longer cares.
    pub fn wake(&self) {
        wake::signal(&self.sender)
    }
}
