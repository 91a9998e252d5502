use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, RawFd};

/// Self-pipe used to interrupt a `poll(2)` wait.
///
/// The read end occupies slot 0 of the selector's wait-vector; writing a
/// byte to the other end makes that slot readable and the wait return. Both
/// ends are non-blocking, so signalling a full pipe fails harmlessly (a wake
/// is already pending) and draining stops at `WouldBlock`.
#[derive(Debug)]
pub(crate) struct WakePipe {
    receiver: File,
    sender: File,
}

impl WakePipe {
    pub(crate) fn new() -> io::Result<WakePipe> {
        let mut fds = [0, 0];
        syscall!(pipe(fds.as_mut_ptr()))?;

        // Wrap both endpoints first so any failure below closes them.
        let receiver = unsafe { File::from_raw_fd(fds[0]) };
        let sender = unsafe { File::from_raw_fd(fds[1]) };

        for fd in fds {
            let flags = syscall!(fcntl(fd, libc::F_GETFL))?;
            syscall!(fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK))?;
            syscall!(fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC))?;
        }

        log::trace!(
            "new wake pipe: receiver={}, sender={}",
            receiver.as_raw_fd(),
            sender.as_raw_fd()
        );

        Ok(WakePipe { receiver, sender })
    }

    /// The descriptor registered in wait slot 0.
    pub(crate) fn reader(&self) -> RawFd {
        self.receiver.as_raw_fd()
    }

    /// Duplicate the write end for a cross-thread [`Waker`] handle.
    ///
    /// [`Waker`]: crate::Waker
    pub(crate) fn try_clone_sender(&self) -> io::Result<File> {
        self.sender.try_clone()
    }

    pub(crate) fn wake(&self) {
        signal(&self.sender)
    }

    /// Empty the pipe after slot 0 polled readable. Returns whether any
    /// bytes were consumed.
    ///
    /// `WouldBlock` ends the drain successfully; an interrupted read is
    /// retried; end-of-file or any other error means the wake channel is
    /// broken and surfaces as the caller's error.
    pub(crate) fn drain(&self) -> io::Result<bool> {
        let mut buf = [0; 1024];
        let mut drained = false;
        loop {
            match (&self.receiver).read(&mut buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "wake pipe closed",
                    ))
                }
                Ok(_) => drained = true,
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(drained),
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

/// Write the sentinel byte into `sender`.
///
/// Wake-ups coalesce: a failed write means either a wake is already pending
/// (full pipe) or the selector is going away, so every failure except an
/// interrupted write is ignored.
pub(crate) fn signal(mut sender: &File) {
    loop {
        match sender.write(&[1]) {
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            _ => return,
        }
    }
}
