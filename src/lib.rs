//! A level-triggered I/O readiness multiplexer built on `poll(2)`.
//!
//! A [`Selector`] owns a set of registered [`Selectable`] objects. Each
//! registrant contributes zero or more wait slots to a packed wait-vector,
//! the selector blocks in `poll(2)` until something becomes ready (or a
//! timeout elapses, or a [`Waker`] interrupts the wait from another thread)
//! and then delivers readiness back to the owning objects, in registration
//! order.
//!
//! The selector is single-threaded and cooperative: registrant callbacks run
//! on the thread calling [`Selector::wait`] and may mutate the registration
//! set (including removing themselves) while dispatch is underway. The one
//! cross-thread operation is waking, via the [`Waker`] handle.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::io::Write;
//! use std::os::fd::AsRawFd;
//! use std::os::unix::net::UnixStream;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use pollmux::{FdSource, Interest, Selector};
//!
//! # fn main() -> std::io::Result<()> {
//! let (mut tx, rx) = UnixStream::pair()?;
//! rx.set_nonblocking(true)?;
//!
//! let mut selector = Selector::new()?;
//! let source = Rc::new(RefCell::new(FdSource::new(
//!     rx.as_raw_fd(),
//!     Interest::READABLE,
//! )));
//! selector.add(source.clone());
//!
//! tx.write_all(b"ping")?;
//!
//! assert!(selector.wait(Some(Duration::from_millis(500)))?);
//! let event = source.borrow_mut().take_event().unwrap();
//! assert!(event.is_readable());
//! #     Ok(())
//! # }
//! ```
#![deny(missing_docs)]

#[cfg(not(unix))]
compile_error!("pollmux relies on poll(2) and pipes and only supports Unix targets");

/// Helper macro to execute a system call that returns an `io::Result`.
//
// Macro must be defined before any modules that uses them.
macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)* ) ) => {{
        let res = unsafe { libc::$fn($($arg, )*) };
        if res == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(res)
        }
    }};
}

mod clock;
mod fd_source;
mod interest;
mod poll_fd;
mod selectable;
mod selector;
mod token;
mod wake;
mod waker;

pub use crate::fd_source::FdSource;
pub use crate::interest::Interest;
pub use crate::poll_fd::PollFd;
pub use crate::selectable::Selectable;
pub use crate::selector::{Device, Selector};
pub use crate::token::Token;
pub use crate::waker::Waker;
