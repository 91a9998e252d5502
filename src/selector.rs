use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::mem;
use std::ops::Bound::{Excluded, Unbounded};
use std::ops::Range;
use std::rc::Rc;
use std::time::Duration;

use crate::clock::Stopwatch;
use crate::wake::WakePipe;
use crate::{Interest, PollFd, Selectable, Token, Waker};

/// Shared handle to a registrant, as stored by the [`Selector`].
pub type Device = Rc<RefCell<dyn Selectable>>;

struct Entry {
    dev: Device,
    /// Slot range into the wait-vector; valid while the vector is not
    /// dirty, empty for a device that was disabled at rebuild time.
    slots: Range<usize>,
}

/// The multiplexer orchestrating waits and dispatch.
///
/// Registrants enter via [`add`] and are identified by the returned
/// [`Token`]. [`wait`] blocks in `poll(2)` on a packed wait-vector (slot 0
/// is always the internal wake pipe, the rest is contributed by the enabled
/// registrants) and then walks the registrants in registration order,
/// delivering the kernel's verdict through
/// [`Selectable::check_poll_event`].
///
/// All operations except waking must run on the thread driving [`wait`];
/// hand a [`Waker`] from [`waker`] to any thread that needs to interrupt a
/// wait.
///
/// [`add`]: Selector::add
/// [`wait`]: Selector::wait
/// [`waker`]: Selector::waker
pub struct Selector {
    devices: BTreeMap<Token, Entry>,
    /// Registrants known synchronously ready; always a subset of `devices`.
    avail: BTreeSet<Token>,
    poll_fds: Vec<PollFd>,
    dirty: bool,
    /// Dispatch cursor; `None` whenever no `wait` call is on the stack.
    current: Option<Token>,
    wake: WakePipe,
    next_token: usize,
}

impl Selector {
    /// Create a selector with its wake pipe.
    ///
    /// Fails if the pipe cannot be created or configured; any endpoint
    /// acquired by then is released.
    pub fn new() -> io::Result<Selector> {
        let wake = WakePipe::new()?;
        Ok(Selector {
            devices: BTreeMap::new(),
            avail: BTreeSet::new(),
            poll_fds: Vec::new(),
            dirty: true,
            current: None,
            wake,
            next_token: 0,
        })
    }

    /// Register a device, returning its token.
    ///
    /// The device's [`avail`] state seeds the synchronous-readiness set and
    /// [`Selectable::attached`] is sent with the new token. Adding the same
    /// underlying object twice yields two independent registrations.
    ///
    /// [`avail`]: Selectable::avail
    pub fn add(&mut self, dev: Device) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;

        self.devices.insert(
            token,
            Entry {
                dev: Rc::clone(&dev),
                slots: 0..0,
            },
        );
        self.dirty = true;

        if dev.borrow().avail() {
            self.avail.insert(token);
        }
        dev.borrow_mut().attached(token);

        log::trace!("add: token={:?}", token);
        token
    }

    /// Deregister the device behind `token`; unknown tokens are a no-op.
    ///
    /// Safe to call from inside any registrant's event callback, including
    /// the registrant being removed: the dispatch cursor advances past the
    /// erased entry atomically with the erase.
    pub fn remove(&mut self, token: Token) {
        let Some(entry) = self.devices.remove(&token) else {
            return;
        };
        self.avail.remove(&token);
        if self.current == Some(token) {
            self.current = self.next_after(token);
        }
        self.dirty = true;
        log::trace!("remove: token={:?}", token);

        // A device removing itself mid-callback is already borrowed; it
        // initiated the removal and needs no notification.
        if let Ok(mut dev) = entry.dev.try_borrow_mut() {
            dev.detached();
        };
    }

    /// Record that the device's synchronous availability flipped.
    ///
    /// With `avail` true the next [`wait`] uses a zero timeout and returns
    /// `true` even if the kernel reports nothing. Unknown tokens are
    /// ignored. Does not mark the wait-vector dirty; only structural and
    /// layout changes do.
    ///
    /// [`wait`]: Selector::wait
    pub fn changed(&mut self, token: Token, avail: bool) {
        if !self.devices.contains_key(&token) {
            return;
        }
        if avail {
            self.avail.insert(token);
        } else {
            self.avail.remove(&token);
        }
    }

    /// Mark the wait-vector dirty because the device's slot layout or
    /// interests changed without a membership change.
    ///
    /// Needed after e.g. [`FdSource::set_interest`] or
    /// [`FdSource::set_enabled`] so the next [`wait`] rebuilds.
    ///
    /// [`FdSource::set_interest`]: crate::FdSource::set_interest
    /// [`FdSource::set_enabled`]: crate::FdSource::set_enabled
    /// [`wait`]: Selector::wait
    pub fn reregister(&mut self, token: Token) {
        if self.devices.contains_key(&token) {
            self.dirty = true;
        }
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns true if no device is registered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Wake a concurrent or subsequent [`wait`] from this thread.
    ///
    /// Wake-ups coalesce and write failures are ignored: a pending wake
    /// already guarantees the wait returns promptly. For waking from other
    /// threads use a [`Waker`] handle instead; the selector itself is not
    /// `Sync`.
    ///
    /// [`wait`]: Selector::wait
    pub fn wake(&self) {
        self.wake.wake();
    }

    /// Create a cross-thread wake handle for this selector.
    pub fn waker(&self) -> io::Result<Waker> {
        Ok(Waker::new(self.wake.try_clone_sender()?))
    }

    /// Block until a registrant observes an event, the wake pipe fires, or
    /// the timeout elapses. `None` waits forever.
    ///
    /// Returns whether anything became available: a readiness event
    /// delivered to a registrant, a wake, or a non-empty synchronous-
    /// readiness set (which also forces a zero timeout). `Ok(false)` means
    /// the call timed out with nothing ready.
    ///
    /// An interrupted `poll(2)` is retried with the elapsed time deducted
    /// from the remaining budget. Any other `poll(2)` failure, a broken
    /// wake pipe, or an error from a registrant callback surfaces as the
    /// call's error; the selector stays consistent and may be waited on
    /// again.
    pub fn wait(&mut self, timeout: Option<Duration>) -> io::Result<bool> {
        // In case a previous dispatch unwound without cleanup.
        self.current = None;

        let mut clock = Stopwatch::start();
        let mut remaining = if self.avail.is_empty() {
            timeout
        } else {
            // Synchronous work is pending; blocking would be incorrect.
            Some(Duration::ZERO)
        };

        if self.dirty {
            self.rebuild();
        }

        let ready = loop {
            let millis = match remaining {
                Some(budget) => duration_to_millis(budget),
                None => -1,
            };
            log::trace!("poll: {} fds, timeout={}ms", self.poll_fds.len(), millis);
            let res = syscall!(poll(
                self.poll_fds.as_mut_ptr() as *mut libc::pollfd,
                self.poll_fds.len() as libc::nfds_t,
                millis,
            ));
            match res {
                Ok(n) => break n as usize,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                    if let Some(budget) = remaining.as_mut() {
                        *budget = budget.saturating_sub(clock.lap());
                    }
                }
                Err(err) => return Err(err),
            }
        };
        log::trace!("poll: {} ready", ready);

        if ready == 0 && self.avail.is_empty() {
            return Ok(false);
        }

        // Dispatch walks a snapshot of the wait-vector so callbacks may
        // freely mutate the registration (and with it the real vector).
        let fds = mem::take(&mut self.poll_fds);
        let result = self.dispatch(&fds);
        self.poll_fds = fds;
        self.current = None;
        result
    }

    fn dispatch(&mut self, fds: &[PollFd]) -> io::Result<bool> {
        let mut observed = !self.avail.is_empty();

        if fds[0].is_ready() {
            if fds[0].is_error() || fds[0].is_hup() {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "error event on wake pipe",
                ));
            }
            if self.wake.drain()? {
                observed = true;
            }
        }

        // Devices registered during this dispatch carry later tokens and
        // are picked up by the next wait, after a rebuild.
        let bound = Token(self.next_token);

        self.current = self.devices.keys().next().copied();
        while let Some(token) = self.current {
            if token >= bound {
                break;
            }

            let (dev, slots) = {
                let entry = &self.devices[&token];
                (Rc::clone(&entry.dev), entry.slots.clone())
            };

            let enabled = dev.borrow().enabled();
            if enabled && dev.borrow_mut().check_poll_event(self, &fds[slots])? {
                observed = true;
            }

            // The callback advanced the cursor itself if it removed `token`.
            if self.current == Some(token) {
                self.current = self.next_after(token);
            }
        }

        Ok(observed)
    }

    /// Regenerate the packed wait-vector from the enabled devices.
    fn rebuild(&mut self) {
        let mut len = 1;
        for entry in self.devices.values() {
            let dev = entry.dev.borrow();
            if dev.enabled() {
                len += dev.poll_size();
            }
        }

        self.poll_fds.clear();
        self.poll_fds.resize(len, PollFd::unused());
        self.poll_fds[0] = PollFd::new(self.wake.reader(), Interest::READABLE);

        let mut offset = 1;
        for entry in self.devices.values_mut() {
            let mut dev = entry.dev.borrow_mut();
            if !dev.enabled() {
                entry.slots = 0..0;
                continue;
            }
            let size = dev.poll_size();
            debug_assert!(
                offset + size <= self.poll_fds.len(),
                "device reported a larger poll_size during init than during sizing"
            );
            let used = dev.init_poll(&mut self.poll_fds[offset..offset + size]);
            debug_assert_eq!(
                used, size,
                "init_poll consumed {} of {} promised slots",
                used, size
            );
            entry.slots = offset..offset + used;
            offset += used;
        }

        self.dirty = false;
        log::trace!("rebuild: {} slots", self.poll_fds.len());
    }

    fn next_after(&self, token: Token) -> Option<Token> {
        self.devices
            .range((Excluded(token), Unbounded))
            .next()
            .map(|(&token, _)| token)
    }
}

impl Drop for Selector {
    fn drop(&mut self) {
        // Detach every remaining registrant; the wake pipe endpoints close
        // with their files.
        for entry in mem::take(&mut self.devices).into_values() {
            if let Ok(mut dev) = entry.dev.try_borrow_mut() {
                dev.detached();
            }
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("devices", &self.devices.len())
            .field("avail", &self.avail)
            .field("dirty", &self.dirty)
            .field("poll_fds", &self.poll_fds)
            .finish()
    }
}

/// Convert the remaining budget to a whole-millisecond `poll(2)` timeout.
fn duration_to_millis(timeout: Duration) -> libc::c_int {
    // Round up so a sub-millisecond budget still blocks instead of spinning.
    let mut millis: u64 = timeout.as_millis().try_into().unwrap_or(u64::MAX);
    if Duration::from_millis(millis) < timeout {
        millis = millis.saturating_add(1);
    }
    millis.try_into().unwrap_or(libc::c_int::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        size: usize,
        enabled: bool,
        avail: bool,
        token: Option<Token>,
    }

    impl Stub {
        fn new(size: usize) -> Stub {
            Stub {
                size,
                enabled: true,
                avail: false,
                token: None,
            }
        }

        fn shared(self) -> Rc<RefCell<Stub>> {
            Rc::new(RefCell::new(self))
        }
    }

    impl Selectable for Stub {
        fn attached(&mut self, token: Token) {
            self.token = Some(token);
        }

        fn detached(&mut self) {
            self.token = None;
        }

        fn enabled(&self) -> bool {
            self.enabled
        }

        fn avail(&self) -> bool {
            self.avail
        }

        fn poll_size(&self) -> usize {
            self.size
        }

        fn init_poll(&mut self, slots: &mut [PollFd]) -> usize {
            // fd -1 slots are ignored by poll(2), which is all these
            // layout tests need.
            for slot in slots.iter_mut() {
                slot.set(-1, Interest::READABLE);
            }
            slots.len()
        }

        fn check_poll_event(&mut self, _: &mut Selector, _: &[PollFd]) -> io::Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn rebuild_packs_slots_of_enabled_devices() {
        let mut selector = Selector::new().unwrap();
        selector.add(Stub::new(1).shared());
        selector.add(Stub::new(3).shared());

        let mut disabled = Stub::new(2);
        disabled.enabled = false;
        selector.add(disabled.shared());

        selector.rebuild();
        assert_eq!(selector.poll_fds.len(), 1 + 1 + 3);
        assert_eq!(selector.poll_fds[0].fd(), selector.wake.reader());

        let ranges: Vec<_> = selector
            .devices
            .values()
            .map(|entry| entry.slots.clone())
            .collect();
        assert_eq!(ranges, vec![1..2, 2..5, 0..0]);
    }

    #[test]
    fn avail_stays_subset_of_devices() {
        let mut selector = Selector::new().unwrap();

        let mut ready = Stub::new(0);
        ready.avail = true;
        let token = selector.add(ready.shared());
        assert!(selector.avail.contains(&token));

        selector.changed(token, false);
        assert!(selector.avail.is_empty());
        selector.changed(token, true);
        assert!(selector.avail.contains(&token));

        // Unknown tokens never enter the set.
        selector.changed(Token(999), true);
        assert!(!selector.avail.contains(&Token(999)));

        selector.remove(token);
        assert!(selector.avail.is_empty());
    }

    #[test]
    fn cursor_is_clear_outside_wait() {
        let mut selector = Selector::new().unwrap();
        selector.add(Stub::new(1).shared());

        assert!(selector.current.is_none());
        assert!(!selector.wait(Some(Duration::ZERO)).unwrap());
        assert!(selector.current.is_none());
    }

    #[test]
    fn remove_unknown_token_is_noop() {
        let mut selector = Selector::new().unwrap();
        let token = selector.add(Stub::new(1).shared());
        selector.remove(Token(42));
        assert_eq!(selector.len(), 1);
        selector.remove(token);
        selector.remove(token);
        assert!(selector.is_empty());
    }

    #[test]
    fn drop_detaches_remaining_devices() {
        let stub = Stub::new(1).shared();
        let selector = {
            let mut selector = Selector::new().unwrap();
            selector.add(Rc::clone(&stub) as Device);
            selector
        };
        assert!(stub.borrow().token.is_some());
        drop(selector);
        assert!(stub.borrow().token.is_none());
    }

    #[test]
    fn attach_and_detach_messages() {
        let stub = Stub::new(0).shared();
        let mut selector = Selector::new().unwrap();

        let token = selector.add(Rc::clone(&stub) as Device);
        assert_eq!(stub.borrow().token, Some(token));

        selector.remove(token);
        assert_eq!(stub.borrow().token, None);
    }
}
