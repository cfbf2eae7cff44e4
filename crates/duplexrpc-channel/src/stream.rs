use std::net::Shutdown;
use std::os::fd::{AsFd, BorrowedFd};
use std::path::Path;

use bytes::Bytes;
use duplexrpc_frame::{FrameConfig, FrameReader, FrameWriter};
use duplexrpc_transport::{IpcStream, UnixDomainSocket};
use tracing::debug;

use crate::channel::{MessageChannel, Selectable};
use crate::error::{ChannelError, Result};
use crate::value::{JsonCodec, ValueCodec};

/// A message channel over a connected byte-stream socket.
///
/// Reads and writes go through separate descriptors of the same socket, each
/// wrapped in the length-prefixed frame codec.
pub struct StreamChannel<C = JsonCodec> {
    reader: Option<FrameReader<IpcStream>>,
    writer: Option<FrameWriter<IpcStream>>,
    codec: C,
}

impl StreamChannel<JsonCodec> {
    /// Wrap a connected stream, using JSON encoding.
    pub fn from_stream(stream: IpcStream) -> Result<Self> {
        Self::with_codec(stream, JsonCodec, FrameConfig::default())
    }

    /// Connect to a listening Unix domain socket.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_stream(UnixDomainSocket::connect(path)?)
    }

    /// A connected pair of channels, for two threads of one process.
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = IpcStream::pair()?;
        Ok((Self::from_stream(left)?, Self::from_stream(right)?))
    }
}

impl<C: ValueCodec> StreamChannel<C> {
    /// Wrap a connected stream with an explicit codec and frame configuration.
    pub fn with_codec(stream: IpcStream, codec: C, config: FrameConfig) -> Result<Self> {
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: Some(FrameReader::with_config(read_stream, config.clone())),
            writer: Some(FrameWriter::with_config(stream, config)),
            codec,
        })
    }
}

impl<C: ValueCodec> Selectable for StreamChannel<C> {
    fn poll_handle(&self) -> Result<BorrowedFd<'_>> {
        self.reader
            .as_ref()
            .map(|reader| reader.get_ref().as_fd())
            .ok_or(ChannelError::Closed)
    }

    fn has_buffered_message(&self) -> bool {
        self.reader
            .as_ref()
            .is_some_and(|reader| reader.has_buffered_frame())
    }
}

impl<C: ValueCodec> MessageChannel for StreamChannel<C> {
    type Codec = C;

    fn codec(&self) -> &C {
        &self.codec
    }

    fn send_message(&mut self, payload: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(ChannelError::Closed)?;
        writer.send(payload)?;
        Ok(())
    }

    fn recv_message(&mut self) -> Result<Option<Bytes>> {
        let reader = self.reader.as_mut().ok_or(ChannelError::Closed)?;
        match reader.read_frame() {
            Ok(Some(payload)) => Ok(Some(payload)),
            Ok(None) => {
                debug!("peer closed the stream");
                self.reader = None;
                Ok(None)
            }
            Err(err) => {
                if reader.is_finished() {
                    self.reader = None;
                }
                Err(err.into())
            }
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    fn close(&mut self) {
        // The read and write halves are separate descriptors; shut the
        // connection down so the peer sees end-of-stream right away.
        if let Some(writer) = &self.writer {
            let _ = writer.get_ref().shutdown(Shutdown::Both);
        } else if let Some(reader) = &self.reader {
            let _ = reader.get_ref().shutdown(Shutdown::Both);
        }
        self.reader = None;
        self.writer = None;
    }
}
