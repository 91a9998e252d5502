use std::fmt;
use std::os::fd::RawFd;

use crate::Interest;

/// A single wait slot of the selector's wait-vector.
///
/// Transparent wrapper around `libc::pollfd`. Before the wait a registrant
/// fills its assigned slots with a file descriptor and an [`Interest`] via
/// [`set`]; after the wait the same slot carries the kernel's readiness
/// verdict, inspected through [`is_readable`] and friends.
///
/// [`set`]: PollFd::set
/// [`is_readable`]: PollFd::is_readable
#[repr(transparent)]
#[derive(Copy, Clone)]
pub struct PollFd(libc::pollfd);

impl PollFd {
    /// A slot ignored by `poll(2)`: fd -1, no interests, no results.
    pub(crate) const fn unused() -> PollFd {
        PollFd(libc::pollfd {
            fd: -1,
            events: 0,
            revents: 0,
        })
    }

    /// Returns a slot monitoring `fd` for `interest`.
    pub fn new(fd: RawFd, interest: Interest) -> PollFd {
        PollFd(libc::pollfd {
            fd,
            events: interest_to_events(interest),
            revents: 0,
        })
    }

    /// Point this slot at `fd` with `interest`, clearing any previous result.
    pub fn set(&mut self, fd: RawFd, interest: Interest) {
        self.0.fd = fd;
        self.0.events = interest_to_events(interest);
        self.0.revents = 0;
    }

    /// The monitored file descriptor, or -1 for an unused slot.
    pub fn fd(&self) -> RawFd {
        self.0.fd
    }

    /// Returns true if the slot reported any readiness at all.
    pub fn is_ready(&self) -> bool {
        self.0.revents != 0
    }

    /// Returns true if the slot reported readable readiness.
    pub fn is_readable(&self) -> bool {
        (self.0.revents & (libc::POLLIN | libc::POLLPRI)) != 0
    }

    /// Returns true if the slot reported writable readiness.
    pub fn is_writable(&self) -> bool {
        (self.0.revents & libc::POLLOUT) != 0
    }

    /// Returns true if the slot reported an error condition or an invalid
    /// descriptor.
    pub fn is_error(&self) -> bool {
        (self.0.revents & (libc::POLLERR | libc::POLLNVAL)) != 0
    }

    /// Returns true if the slot reported a hangup.
    pub fn is_hup(&self) -> bool {
        (self.0.revents & libc::POLLHUP) != 0
    }
}

impl fmt::Debug for PollFd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("pollfd")
            .field("fd", &self.0.fd)
            .field("events", &self.0.events)
            .field("revents", &self.0.revents)
            .finish()
    }
}

/// Get the input poll events for the given interest.
fn interest_to_events(interest: Interest) -> libc::c_short {
    let mut kind = 0;

    if interest.is_readable() {
        kind |= libc::POLLIN | libc::POLLPRI;
    }

    if interest.is_writable() {
        kind |= libc::POLLOUT | libc::POLLWRBAND;
    }

    kind
}
