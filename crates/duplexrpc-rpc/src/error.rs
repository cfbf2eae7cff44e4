use std::io::ErrorKind;

use duplexrpc_channel::ChannelError;
use duplexrpc_frame::FrameError;
use serde_json::Value;

/// Errors surfaced by the RPC layer.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Channel-level error (framing, codec, claim state).
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Transport-level error (bind, connect, accept).
    #[error("transport error: {0}")]
    Transport(#[from] duplexrpc_transport::TransportError),

    /// The peer has no handler registered under this name.
    #[error("remote peer has no function named {0:?}")]
    UnknownRemoteFunction(String),

    /// The remote handler ran and failed; carries its error payload.
    #[error("remote handler failed: {0}")]
    Remote(Value),

    /// The peer closed its end while we were waiting on it.
    #[error("peer is gone")]
    PeerGone,

    /// A response or error arrived when no call was outstanding.
    #[error("unexpected {0} envelope with no call outstanding")]
    UnexpectedEnvelope(&'static str),

    /// A call argument could not be converted to the value model.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[source] serde_json::Error),
}

impl RpcError {
    /// Fold channel errors that only mean "the other side went away" into
    /// [`RpcError::PeerGone`].
    pub(crate) fn from_channel(err: ChannelError) -> Self {
        match err {
            ChannelError::Closed | ChannelError::Frame(FrameError::ConnectionClosed) => {
                RpcError::PeerGone
            }
            ChannelError::Frame(FrameError::Io(ref io))
                if matches!(
                    io.kind(),
                    ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::NotConnected
                ) =>
            {
                RpcError::PeerGone
            }
            other => RpcError::Channel(other),
        }
    }

    /// Whether this error means the peer is no longer reachable.
    pub fn is_peer_gone(&self) -> bool {
        matches!(self, RpcError::PeerGone)
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_and_broken_pipe_mean_peer_gone() {
        assert!(RpcError::from_channel(ChannelError::Closed).is_peer_gone());
        let broken = FrameError::Io(std::io::Error::from(ErrorKind::BrokenPipe));
        assert!(RpcError::from_channel(ChannelError::Frame(broken)).is_peer_gone());
    }

    #[test]
    fn other_channel_errors_are_kept() {
        let err = RpcError::from_channel(ChannelError::Unclaimed);
        assert!(matches!(err, RpcError::Channel(ChannelError::Unclaimed)));

        let truncated = FrameError::Truncated {
            expected: 10,
            buffered: 3,
        };
        let err = RpcError::from_channel(ChannelError::Frame(truncated));
        assert!(matches!(
            err,
            RpcError::Channel(ChannelError::Frame(FrameError::Truncated { .. }))
        ));
    }
}
