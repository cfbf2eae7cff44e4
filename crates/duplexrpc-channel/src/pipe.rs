use std::fmt;
use std::os::fd::{AsFd, BorrowedFd};

use bytes::Bytes;
use duplexrpc_frame::{FrameConfig, FrameReader, FrameWriter};
use duplexrpc_transport::{PipeReader, PipeWriter};
use tracing::debug;

use crate::channel::{MessageChannel, Selectable};
use crate::error::{ChannelError, Result};
use crate::value::{JsonCodec, ValueCodec};

/// The role a process takes on one half of a pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfRole {
    Reader,
    Writer,
}

impl fmt::Display for HalfRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalfRole::Reader => f.write_str("reader"),
            HalfRole::Writer => f.write_str("writer"),
        }
    }
}

/// Which end of a duplex [`Pipe`] this process uses.
///
/// The left side writes into the left half and reads from the right half;
/// the right side does the opposite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A unidirectional, selectable message pipe.
///
/// Until claimed, both ends are held by this process, which lets a single
/// thread write and then read its own messages. A process sharing the pipe
/// with a peer claims one role, closing the end it will not use so that the
/// reader observes end-of-stream once the writer is gone.
pub struct UniPipe<C = JsonCodec> {
    reader: Option<FrameReader<PipeReader>>,
    writer: Option<FrameWriter<PipeWriter>>,
    role: Option<HalfRole>,
    codec: C,
    config: FrameConfig,
    open: bool,
}

impl UniPipe<JsonCodec> {
    /// Create a pipe using JSON encoding.
    pub fn new() -> Result<Self> {
        Self::with_codec(JsonCodec, FrameConfig::default())
    }
}

impl<C: ValueCodec> UniPipe<C> {
    /// Create a pipe with an explicit codec and frame configuration.
    pub fn with_codec(codec: C, config: FrameConfig) -> Result<Self> {
        let (reader, writer) = duplexrpc_transport::pipe()?;
        Ok(Self {
            reader: Some(FrameReader::with_config(reader, config.clone())),
            writer: Some(FrameWriter::with_config(writer, config.clone())),
            role: None,
            codec,
            config,
            open: true,
        })
    }

    /// Keep only the write end; the read end is closed in this process.
    pub fn claim_writer(&mut self) -> Result<()> {
        self.claim(HalfRole::Writer)
    }

    /// Keep only the read end; the write end is closed in this process.
    pub fn claim_reader(&mut self) -> Result<()> {
        self.claim(HalfRole::Reader)
    }

    fn claim(&mut self, role: HalfRole) -> Result<()> {
        if self.role.is_some() {
            return Err(ChannelError::AlreadyClaimed);
        }
        if !self.open {
            return Err(ChannelError::Closed);
        }
        match role {
            HalfRole::Reader => self.writer = None,
            HalfRole::Writer => self.reader = None,
        }
        self.role = Some(role);
        Ok(())
    }

    /// The role claimed in this process, if any.
    pub fn role(&self) -> Option<HalfRole> {
        self.role
    }

    /// Duplicate both descriptors, for handing the pipe to another thread.
    ///
    /// Only an unclaimed pipe can be cloned; afterwards each holder claims
    /// its own role.
    pub fn try_clone(&self) -> Result<Self>
    where
        C: Clone,
    {
        if self.role.is_some() {
            return Err(ChannelError::AlreadyClaimed);
        }
        let (Some(reader), Some(writer)) = (&self.reader, &self.writer) else {
            return Err(ChannelError::Closed);
        };
        Ok(Self {
            reader: Some(FrameReader::with_config(
                reader.get_ref().try_clone()?,
                self.config.clone(),
            )),
            writer: Some(FrameWriter::with_config(
                writer.get_ref().try_clone()?,
                self.config.clone(),
            )),
            role: None,
            codec: self.codec.clone(),
            config: self.config.clone(),
            open: true,
        })
    }

    fn missing_half(&self) -> ChannelError {
        match self.role {
            Some(claimed) if self.open => ChannelError::WrongDirection { claimed },
            _ => ChannelError::Closed,
        }
    }
}

impl<C: ValueCodec> Selectable for UniPipe<C> {
    fn poll_handle(&self) -> Result<BorrowedFd<'_>> {
        match &self.reader {
            Some(reader) => Ok(reader.get_ref().as_fd()),
            None => Err(self.missing_half()),
        }
    }

    fn has_buffered_message(&self) -> bool {
        self.reader
            .as_ref()
            .is_some_and(|reader| reader.has_buffered_frame())
    }
}

impl<C: ValueCodec> MessageChannel for UniPipe<C> {
    type Codec = C;

    fn codec(&self) -> &C {
        &self.codec
    }

    fn send_message(&mut self, payload: &[u8]) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(self.missing_half());
        };
        writer.send(payload)?;
        Ok(())
    }

    fn recv_message(&mut self) -> Result<Option<Bytes>> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(self.missing_half());
        };
        match reader.read_frame() {
            Ok(Some(payload)) => Ok(Some(payload)),
            Ok(None) => {
                debug!("pipe writer closed; releasing read end");
                self.reader = None;
                self.open = false;
                Ok(None)
            }
            Err(err) => {
                if reader.is_finished() {
                    self.reader = None;
                    self.open = false;
                }
                Err(err.into())
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.reader = None;
        self.writer = None;
        self.open = false;
    }
}

/// A selectable duplex message pipe, usable between processes or threads.
///
/// Made of two [`UniPipe`]s. The pair is created by a common ancestor; each
/// participant then claims one [`Side`]:
///
/// ```no_run
/// use duplexrpc_channel::{MessageChannel, Pipe};
///
/// let mut parent = Pipe::new()?;
/// let mut child = parent.try_clone()?;
///
/// let worker = std::thread::spawn(move || -> duplexrpc_channel::Result<()> {
///     child.claim_right()?;
///     while let Some(msg) = child.read::<String>()? {
///         child.write(&format!("okay: {msg}"))?;
///     }
///     Ok(())
/// });
///
/// parent.claim_left()?;
/// parent.write("hello")?;
/// assert_eq!(parent.read::<String>()?.as_deref(), Some("okay: hello"));
/// parent.close();
/// worker.join().unwrap()?;
/// # Ok::<(), duplexrpc_channel::ChannelError>(())
/// ```
pub struct Pipe<C = JsonCodec> {
    left: UniPipe<C>,
    right: UniPipe<C>,
    side: Option<Side>,
}

impl Pipe<JsonCodec> {
    /// Create a duplex pipe using JSON encoding.
    pub fn new() -> Result<Self> {
        Self::with_codec(JsonCodec, FrameConfig::default())
    }
}

impl<C: ValueCodec + Clone> Pipe<C> {
    /// Create a duplex pipe with an explicit codec and frame configuration.
    pub fn with_codec(codec: C, config: FrameConfig) -> Result<Self> {
        Ok(Self {
            left: UniPipe::with_codec(codec.clone(), config.clone())?,
            right: UniPipe::with_codec(codec, config)?,
            side: None,
        })
    }

    /// Duplicate all four descriptors, for handing the pipe to a thread.
    pub fn try_clone(&self) -> Result<Self> {
        if self.side.is_some() {
            return Err(ChannelError::AlreadyClaimed);
        }
        Ok(Self {
            left: self.left.try_clone()?,
            right: self.right.try_clone()?,
            side: None,
        })
    }
}

impl<C: ValueCodec> Pipe<C> {
    /// Claim the left side: write into the left half, read from the right.
    pub fn claim_left(&mut self) -> Result<()> {
        self.claim(Side::Left)
    }

    /// Claim the right side: write into the right half, read from the left.
    pub fn claim_right(&mut self) -> Result<()> {
        self.claim(Side::Right)
    }

    fn claim(&mut self, side: Side) -> Result<()> {
        if self.side.is_some() {
            return Err(ChannelError::AlreadyClaimed);
        }
        let (write_half, read_half) = match side {
            Side::Left => (&mut self.left, &mut self.right),
            Side::Right => (&mut self.right, &mut self.left),
        };
        write_half.claim_writer()?;
        read_half.claim_reader()?;
        self.side = Some(side);
        debug!(?side, "claimed pipe");
        Ok(())
    }

    /// The side claimed in this process, if any.
    pub fn side(&self) -> Option<Side> {
        self.side
    }

    fn write_half(&mut self) -> Result<&mut UniPipe<C>> {
        match self.side {
            Some(Side::Left) => Ok(&mut self.left),
            Some(Side::Right) => Ok(&mut self.right),
            None => Err(ChannelError::Unclaimed),
        }
    }

    fn read_half(&self) -> Result<&UniPipe<C>> {
        match self.side {
            Some(Side::Left) => Ok(&self.right),
            Some(Side::Right) => Ok(&self.left),
            None => Err(ChannelError::Unclaimed),
        }
    }

    fn read_half_mut(&mut self) -> Result<&mut UniPipe<C>> {
        match self.side {
            Some(Side::Left) => Ok(&mut self.right),
            Some(Side::Right) => Ok(&mut self.left),
            None => Err(ChannelError::Unclaimed),
        }
    }
}

impl<C: ValueCodec> Selectable for Pipe<C> {
    fn poll_handle(&self) -> Result<BorrowedFd<'_>> {
        self.read_half()?.poll_handle()
    }

    fn has_buffered_message(&self) -> bool {
        self.read_half()
            .is_ok_and(|half| half.has_buffered_message())
    }
}

impl<C: ValueCodec> MessageChannel for Pipe<C> {
    type Codec = C;

    fn codec(&self) -> &C {
        &self.left.codec
    }

    fn send_message(&mut self, payload: &[u8]) -> Result<()> {
        self.write_half()?.send_message(payload)
    }

    fn recv_message(&mut self) -> Result<Option<Bytes>> {
        self.read_half_mut()?.recv_message()
    }

    /// Open means claimed with a live read half. An unclaimed `Pipe` cannot
    /// receive, so it reports closed; unlike [`UniPipe`], it never reads its
    /// own writes.
    fn is_open(&self) -> bool {
        self.read_half().is_ok_and(|half| half.is_open())
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
    }
}
