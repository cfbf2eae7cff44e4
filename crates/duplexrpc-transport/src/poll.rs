//! Readiness multiplexing.
//!
//! Fan-in across several channels is done by waiting on their read
//! descriptors together and then reading only from the ones reported ready,
//! never by blocking on several reads at once.

use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::Duration;

use tracing::trace;

use crate::error::{Result, TransportError};

/// Block until at least one descriptor is readable, or `timeout` elapses.
///
/// Returns the indices (into `fds`) of descriptors that are readable, hung up
/// or in an error state; a hung-up descriptor is reported so the caller's next
/// read observes end-of-stream instead of waiting forever. An empty result
/// means the timeout expired. `None` waits indefinitely.
pub fn wait_readable(fds: &[BorrowedFd<'_>], timeout: Option<Duration>) -> Result<Vec<usize>> {
    let mut pollfds: Vec<libc::pollfd> = fds
        .iter()
        .map(|fd| libc::pollfd {
            fd: fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        })
        .collect();

    let timeout_ms = match timeout {
        Some(timeout) => timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
        None => -1,
    };

    loop {
        // SAFETY: `pollfds` is a valid, initialized slice of `pollfds.len()` entries
        // and every descriptor in it is borrowed for the duration of the call.
        let rc = unsafe {
            libc::poll(
                pollfds.as_mut_ptr(),
                pollfds.len() as libc::nfds_t,
                timeout_ms,
            )
        };
        if rc >= 0 {
            break;
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(TransportError::Poll(err));
        }
    }

    let ready: Vec<usize> = pollfds
        .iter()
        .enumerate()
        .filter(|(_, pfd)| pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0)
        .map(|(idx, _)| idx)
        .collect();

    trace!(waiting = fds.len(), ready = ready.len(), "poll returned");
    Ok(ready)
}
