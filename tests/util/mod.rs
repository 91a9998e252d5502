// Not all functions are used by all tests.
#![allow(dead_code)]

use std::fs::File;
use std::io::{self, Read};
use std::os::fd::FromRawFd;
use std::sync::Once;

pub fn init() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        env_logger::try_init().expect("unable to initialise logger");
    })
}

pub fn assert_sync<T: Sync>() {}
pub fn assert_send<T: Send>() {}

/// Non-blocking pipe pair `(reader, writer)` for feeding readiness by hand.
pub fn pipe() -> (File, File) {
    let mut fds = [0, 0];
    let res = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert_eq!(res, 0, "pipe: {}", io::Error::last_os_error());

    for fd in fds {
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        assert!(flags != -1, "fcntl: {}", io::Error::last_os_error());
        let res = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        assert!(res != -1, "fcntl: {}", io::Error::last_os_error());
    }

    let reader = unsafe { File::from_raw_fd(fds[0]) };
    let writer = unsafe { File::from_raw_fd(fds[1]) };
    (reader, writer)
}

/// Read the pipe empty so it no longer reports readable.
pub fn drain(mut reader: &File) {
    let mut buf = [0; 64];
    loop {
        match reader.read(&mut buf) {
            Ok(n) if n > 0 => continue,
            _ => return,
        }
    }
}
