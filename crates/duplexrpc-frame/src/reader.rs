use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::codec::{announced_size, decode_frame, frame_ready, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get whole payloads.
/// Bytes read past the end of one frame are kept for the next call.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    eof: bool,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            eof: false,
        }
    }

    /// Read the next complete frame payload (blocking).
    ///
    /// Returns `Ok(None)` exactly once, when the stream ends on a frame
    /// boundary. Every later call fails with [`FrameError::Closed`] without
    /// touching the stream. A stream that ends inside a frame yields
    /// [`FrameError::Truncated`].
    ///
    /// A header announcing more than `max_payload_size` leaves the stream
    /// unsynchronized: the reader reports [`FrameError::PayloadTooLarge`]
    /// once and is finished from then on.
    pub fn read_frame(&mut self) -> Result<Option<Bytes>> {
        if self.eof {
            return Err(FrameError::Closed);
        }

        loop {
            match decode_frame(&mut self.buf, self.config.max_payload_size) {
                Ok(Some(payload)) => {
                    trace!(size = payload.len(), "read frame");
                    return Ok(Some(payload));
                }
                Ok(None) => {}
                Err(err) => {
                    debug!(error = %err, "unreadable frame header; giving up on stream");
                    self.eof = true;
                    self.buf.clear();
                    return Err(err);
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                self.eof = true;
                if self.buf.is_empty() {
                    debug!("end of stream");
                    return Ok(None);
                }
                let buffered = self.buf.len();
                let expected = announced_size(&self.buf).unwrap_or(HEADER_SIZE);
                self.buf.clear();
                return Err(FrameError::Truncated { expected, buffered });
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Whether the next [`read_frame`](Self::read_frame) can return without
    /// reading from the stream.
    ///
    /// A readiness wait on the underlying descriptor cannot see bytes that
    /// are already buffered here, so multiplexing callers check this first.
    pub fn has_buffered_frame(&self) -> bool {
        frame_ready(&self.buf, self.config.max_payload_size)
    }

    /// Whether end-of-stream has been reached.
    pub fn is_finished(&self) -> bool {
        self.eof
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent frame decoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
