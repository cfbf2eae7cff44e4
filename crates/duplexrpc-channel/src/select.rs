use std::time::Duration;

use duplexrpc_transport::wait_readable;
use tracing::trace;

use crate::channel::Selectable;
use crate::error::{ChannelError, Result};

/// Wait until at least one channel can be read without blocking.
///
/// Returns the indices of the ready channels, in ascending order; an empty
/// result means `timeout` expired. An empty `channels` slice returns an
/// empty result at once, whatever the timeout. A channel counts as ready when a
/// complete message is already buffered, when its read descriptor is
/// readable or hung up, or when its read half is gone (its next read fails
/// fast with [`ChannelError::Closed`]).
///
/// ```no_run
/// use duplexrpc_channel::{select, MessageChannel, Pipe};
///
/// # fn demo(mut first: Pipe, mut second: Pipe) -> duplexrpc_channel::Result<()> {
/// for idx in select(&[&first, &second], None)? {
///     let pipe = if idx == 0 { &mut first } else { &mut second };
///     println!("{:?}", pipe.read::<String>()?);
/// }
/// # Ok(())
/// # }
/// ```
pub fn select(channels: &[&dyn Selectable], timeout: Option<Duration>) -> Result<Vec<usize>> {
    let mut ready = Vec::new();
    let mut polled = Vec::with_capacity(channels.len());
    let mut fds = Vec::with_capacity(channels.len());

    for (idx, channel) in channels.iter().enumerate() {
        if channel.has_buffered_message() {
            ready.push(idx);
            continue;
        }
        match channel.poll_handle() {
            Ok(fd) => {
                polled.push(idx);
                fds.push(fd);
            }
            Err(ChannelError::Closed) => ready.push(idx),
            Err(err) => return Err(err),
        }
    }

    if fds.is_empty() {
        return Ok(ready);
    }

    // Something is ready already: only sweep the rest, never block.
    let timeout = if ready.is_empty() {
        timeout
    } else {
        Some(Duration::ZERO)
    };

    for hit in wait_readable(&fds, timeout)? {
        ready.push(polled[hit]);
    }
    ready.sort_unstable();

    trace!(channels = channels.len(), ready = ready.len(), "select returned");
    Ok(ready)
}
