use std::io;
use std::os::fd::RawFd;

use crate::{Interest, PollFd, Selectable, Selector, Token};

/// Adapter for a [`RawFd`] providing a single-slot [`Selectable`]
/// implementation.
///
/// `FdSource` bridges any descriptor-backed object into a [`Selector`]
/// without writing a `Selectable` by hand. It does **not** take ownership
/// of the descriptor: lifecycle operations such as closing remain the
/// caller's job, and the descriptor must outlive the registration.
///
/// After a wait in which the descriptor fired, [`take_event`] yields the
/// slot exactly as `poll(2)` left it.
///
/// Changing the interest or the enabled flag alters the wait-vector layout,
/// so it must be followed by [`Selector::reregister`] before the next wait.
///
/// [`take_event`]: FdSource::take_event
///
/// # Examples
///
/// ```no_run
/// use std::cell::RefCell;
/// use std::net::TcpListener;
/// use std::os::fd::AsRawFd;
/// use std::rc::Rc;
///
/// use pollmux::{FdSource, Interest, Selector};
///
/// # fn main() -> std::io::Result<()> {
/// let listener = TcpListener::bind("127.0.0.1:0")?;
///
/// let mut selector = Selector::new()?;
/// let source = Rc::new(RefCell::new(FdSource::new(
///     listener.as_raw_fd(),
///     Interest::READABLE,
/// )));
/// selector.add(source.clone());
///
/// while selector.wait(None)? {
///     if let Some(event) = source.borrow_mut().take_event() {
///         if event.is_readable() {
///             let (connection, _) = listener.accept()?;
///             drop(connection);
///         }
///     }
/// }
/// #     Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FdSource {
    fd: RawFd,
    interest: Interest,
    enabled: bool,
    token: Option<Token>,
    event: Option<PollFd>,
}

impl FdSource {
    /// Watch `fd` for `interest`. The descriptor is borrowed, not owned.
    pub fn new(fd: RawFd, interest: Interest) -> FdSource {
        FdSource {
            fd,
            interest,
            enabled: true,
            token: None,
            event: None,
        }
    }

    /// The registration token, while attached to a selector.
    pub fn token(&self) -> Option<Token> {
        self.token
    }

    /// Change the monitored interest; takes effect at the next rebuild.
    pub fn set_interest(&mut self, interest: Interest) {
        self.interest = interest;
    }

    /// Enable or disable participation; takes effect at the next rebuild.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The readiness observed in the last wait, cleared by this call.
    pub fn take_event(&mut self) -> Option<PollFd> {
        self.event.take()
    }
}

impl Selectable for FdSource {
    fn attached(&mut self, token: Token) {
        self.token = Some(token);
    }

    fn detached(&mut self) {
        self.token = None;
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn poll_size(&self) -> usize {
        1
    }

    fn init_poll(&mut self, slots: &mut [PollFd]) -> usize {
        slots[0].set(self.fd, self.interest);
        1
    }

    fn check_poll_event(&mut self, _: &mut Selector, slots: &[PollFd]) -> io::Result<bool> {
        match slots.first() {
            Some(slot) if slot.is_ready() => {
                self.event = Some(*slot);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
