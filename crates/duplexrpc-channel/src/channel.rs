use std::os::fd::BorrowedFd;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::value::ValueCodec;

/// Something a readiness wait can be performed on.
pub trait Selectable {
    /// Descriptor of the active read half, for readiness multiplexing.
    ///
    /// Fails with [`ChannelError::Closed`](crate::ChannelError::Closed) once
    /// the read half has been released.
    fn poll_handle(&self) -> Result<BorrowedFd<'_>>;

    /// Whether a complete message is already buffered in user space.
    ///
    /// Such a message is invisible to the descriptor's readiness, so
    /// [`select`](crate::select) reports it without waiting.
    fn has_buffered_message(&self) -> bool;
}

/// A bidirectional channel that delivers discrete messages in write order.
pub trait MessageChannel: Selectable {
    type Codec: ValueCodec;

    /// The codec used by [`write`](Self::write) and [`read`](Self::read).
    fn codec(&self) -> &Self::Codec;

    /// Send one message atomically (blocking).
    fn send_message(&mut self, payload: &[u8]) -> Result<()>;

    /// Receive the next whole message (blocking).
    ///
    /// `Ok(None)` signals end-of-stream and is returned at most once; every
    /// later call fails fast with [`ChannelError::Closed`](crate::ChannelError::Closed).
    fn recv_message(&mut self) -> Result<Option<Bytes>>;

    /// Whether the channel can still receive.
    fn is_open(&self) -> bool;

    /// Release both halves. Idempotent.
    fn close(&mut self);

    /// Encode `value` and send it as one message.
    fn write<V: Serialize + ?Sized>(&mut self, value: &V) -> Result<()>
    where
        Self: Sized,
    {
        let payload = self.codec().encode(value)?;
        self.send_message(&payload)
    }

    /// Receive and decode the next value; `Ok(None)` at end-of-stream.
    fn read<V: DeserializeOwned>(&mut self) -> Result<Option<V>>
    where
        Self: Sized,
    {
        match self.recv_message()? {
            Some(payload) => Ok(Some(self.codec().decode(&payload)?)),
            None => Ok(None),
        }
    }
}
