use std::io;

use crate::{PollFd, Selector, Token};

/// The contract between a [`Selector`] and each of its registrants.
///
/// A `Selectable` is an object willing to be multiplexed: per wait cycle it
/// reports how many wait slots it needs, fills its assigned slab of the
/// wait-vector, and is asked afterwards whether the kernel's verdict on
/// those slots amounts to an event. Registrants are shared with the selector
/// as `Rc<RefCell<dyn Selectable>>` (see [`Device`]) so that a callback can
/// reach back into the selector while the selector still holds the object.
///
/// # Dispatch re-entrancy
///
/// [`check_poll_event`] receives the selector itself, so an implementation
/// may call [`Selector::add`], [`Selector::remove`] (including removing its
/// own registration) or [`Selector::changed`] from inside the callback. It
/// must **not** call [`Selector::wait`] re-entrantly, and it must not block.
///
/// [`Device`]: crate::Device
/// [`check_poll_event`]: Selectable::check_poll_event
pub trait Selectable {
    /// The registrant has been added to a selector under `token`.
    ///
    /// Keeping the token is what later allows self-deregistration. A
    /// registrant belongs to at most one selector at a time.
    fn attached(&mut self, token: Token) {
        let _ = token;
    }

    /// The registrant has been removed, or its selector is being dropped.
    ///
    /// Not delivered when the registrant removes itself from inside its own
    /// [`check_poll_event`]: the initiator already knows.
    ///
    /// [`check_poll_event`]: Selectable::check_poll_event
    fn detached(&mut self) {}

    /// Whether the registrant participates in the current cycle.
    ///
    /// Disabled registrants contribute no wait slots and receive no
    /// callbacks, but stay registered for later re-enablement. Flipping this
    /// between waits requires [`Selector::reregister`] so the wait-vector is
    /// rebuilt.
    fn enabled(&self) -> bool {
        true
    }

    /// Whether the registrant is ready without waiting, e.g. has buffered
    /// input.
    ///
    /// Consulted once at [`Selector::add`]; afterwards the registrant
    /// reports flips through [`Selector::changed`].
    fn avail(&self) -> bool {
        false
    }

    /// Number of wait slots the registrant needs this cycle. May be zero.
    fn poll_size(&self) -> usize;

    /// Fill the assigned `slots` with descriptors and interests.
    ///
    /// Called during rebuild with exactly [`poll_size`] slots. Returns the
    /// number of slots consumed, which must equal the promise.
    ///
    /// [`poll_size`]: Selectable::poll_size
    fn init_poll(&mut self, slots: &mut [PollFd]) -> usize;

    /// Inspect the slot snapshot after a wait and dispatch internally.
    ///
    /// `slots` is the registrant's slab exactly as `poll(2)` left it; for a
    /// registrant that was disabled at rebuild time it is empty. Returns
    /// whether at least one readiness event was observed. An error resets
    /// the dispatch cursor and surfaces from [`Selector::wait`]; the
    /// selector itself stays consistent and may be waited on again.
    fn check_poll_event(
        &mut self,
        selector: &mut Selector,
        slots: &[PollFd],
    ) -> io::Result<bool>;
}
