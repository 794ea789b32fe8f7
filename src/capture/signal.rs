use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::{io, mem, ptr};

use crate::error::errno;
use crate::warn;

/// Delivers SIGINT and SIGTERM through a file descriptor instead of the
/// default handlers, so a blocking wait can watch for them alongside the
/// capture socket.
///
/// While an [Interrupt] exists both signals are blocked for the calling
/// thread; dropping it closes the descriptor and restores the previous mask.
#[derive(Debug)]
pub struct Interrupt {
    fd: OwnedFd,
    prev_mask: libc::sigset_t,
}

impl Interrupt {
    /// Blocks SIGINT and SIGTERM and opens a `signalfd` for them.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal mask could not be changed or the
    /// `signalfd` could not be created.
    pub fn new() -> io::Result<Self> {
        let mut mask: libc::sigset_t = unsafe { mem::zeroed() };
        let mut prev_mask: libc::sigset_t = unsafe { mem::zeroed() };

        unsafe {
            // Initialize the signal set, excluding all signals.
            if libc::sigemptyset(&raw mut mask) == -1 {
                return Err(errno!("failed to initialize signal set"));
            }

            if libc::sigaddset(&raw mut mask, libc::SIGINT) == -1
                || libc::sigaddset(&raw mut mask, libc::SIGTERM) == -1
            {
                return Err(errno!("failed to add signals to set"));
            }

            // Blocks SIGINT and SIGTERM from being intercepted by default handlers.
            if libc::sigprocmask(libc::SIG_BLOCK, &raw const mask, &raw mut prev_mask) == -1 {
                return Err(errno!("failed to block interrupt signals"));
            }

            let fd = libc::signalfd(-1, &raw const mask, libc::SFD_CLOEXEC);
            if fd == -1 {
                let err = errno!("failed to create signalfd");
                restore_mask(&prev_mask);
                return Err(err);
            }

            Ok(Self {
                // SAFETY: `fd` was just returned by `signalfd` and is owned here.
                fd: OwnedFd::from_raw_fd(fd),
                prev_mask,
            })
        }
    }

    /// Consumes one pending signal, returning its number.
    ///
    /// Only call once the descriptor is readable, otherwise this blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal information could not be read.
    pub fn take(&self) -> io::Result<i32> {
        let mut info: libc::signalfd_siginfo = unsafe { mem::zeroed() };
        let len = mem::size_of::<libc::signalfd_siginfo>();

        let n = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                &raw mut info as *mut libc::c_void,
                len,
            )
        };

        if n == -1 {
            return Err(errno!("failed to read from signalfd"));
        }

        if n as usize != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read from signalfd: {n} bytes (expected {len} bytes)"),
            ));
        }

        Ok(info.ssi_signo as i32)
    }
}

impl AsRawFd for Interrupt {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl Drop for Interrupt {
    fn drop(&mut self) {
        restore_mask(&self.prev_mask);
    }
}

/// Reinstates `mask` as the signal mask, logging on failure.
fn restore_mask(mask: &libc::sigset_t) {
    if unsafe { libc::sigprocmask(libc::SIG_SETMASK, mask, ptr::null_mut()) } == -1 {
        warn!(
            "{}",
            errno!("failed to restore signal mask, SIGINT/SIGTERM stay blocked")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current_mask() -> libc::sigset_t {
        let mut mask: libc::sigset_t = unsafe { mem::zeroed() };
        let res = unsafe { libc::sigprocmask(libc::SIG_BLOCK, ptr::null(), &raw mut mask) };
        assert_eq!(res, 0);
        mask
    }

    fn is_blocked(mask: &libc::sigset_t, signo: i32) -> bool {
        unsafe { libc::sigismember(mask, signo) == 1 }
    }

    #[test]
    fn raised_sigint_is_read_from_descriptor() {
        let interrupt = Interrupt::new().unwrap();

        // Delivered to this thread, where the signal is blocked.
        assert_eq!(unsafe { libc::raise(libc::SIGINT) }, 0);

        assert_eq!(interrupt.take().unwrap(), libc::SIGINT);
    }

    #[test]
    fn raised_sigterm_is_read_from_descriptor() {
        let interrupt = Interrupt::new().unwrap();

        assert_eq!(unsafe { libc::raise(libc::SIGTERM) }, 0);

        assert_eq!(interrupt.take().unwrap(), libc::SIGTERM);
    }

    #[test]
    fn drop_restores_previous_mask() {
        let before = current_mask();

        {
            let _interrupt = Interrupt::new().unwrap();
            let during = current_mask();

            assert!(is_blocked(&during, libc::SIGINT));
            assert!(is_blocked(&during, libc::SIGTERM));
        }

        let after = current_mask();

        assert_eq!(
            is_blocked(&after, libc::SIGINT),
            is_blocked(&before, libc::SIGINT)
        );
        assert_eq!(
            is_blocked(&after, libc::SIGTERM),
            is_blocked(&before, libc::SIGTERM)
        );
    }
}
