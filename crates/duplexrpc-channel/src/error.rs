use duplexrpc_frame::FrameError;
use duplexrpc_transport::TransportError;

use crate::pipe::HalfRole;
use crate::value::CodecError;

/// Errors that can occur on a message channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The channel (or the half needed for this operation) is closed.
    ///
    /// Returned by every read after end-of-stream was reported, and by every
    /// operation after [`close`](crate::MessageChannel::close).
    #[error("channel is closed")]
    Closed,

    /// The pipe has already been claimed.
    #[error("pipe already claimed")]
    AlreadyClaimed,

    /// The pipe must be claimed before it can carry messages.
    #[error("pipe not claimed; call claim_left or claim_right first")]
    Unclaimed,

    /// The operation needs the half this process gave up when claiming.
    #[error("pipe half is claimed as {claimed}")]
    WrongDirection { claimed: HalfRole },

    /// Framing failed (oversized header, truncated frame, I/O).
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl From<FrameError> for ChannelError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Closed => ChannelError::Closed,
            other => ChannelError::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
