/// Identity of a registration within a [`Selector`].
///
/// A `Token` is handed out by [`Selector::add`] and names that registration
/// in every later call: [`Selector::remove`], [`Selector::changed`] and
/// [`Selector::reregister`]. Tokens are issued from a monotonically
/// increasing counter, so the selector dispatches registrants in the order
/// they were added.
///
/// A registrant that wants to deregister itself from inside its own event
/// callback keeps the token it received via [`Selectable::attached`].
///
/// [`Selector`]: crate::Selector
/// [`Selector::add`]: crate::Selector::add
/// [`Selector::remove`]: crate::Selector::remove
/// [`Selector::changed`]: crate::Selector::changed
/// [`Selector::reregister`]: crate::Selector::reregister
/// [`Selectable::attached`]: crate::Selectable::attached
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub usize);
