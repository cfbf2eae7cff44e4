use std::fmt;
use std::io;

use duplexrpc_channel::ChannelError;
use duplexrpc_frame::FrameError;
use duplexrpc_rpc::RpcError;
use duplexrpc_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::NotFound
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } | FrameError::Truncated { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed | FrameError::Closed => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
    }
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::Frame(err) => frame_error(context, err),
        ChannelError::Transport(err) => transport_error(context, err),
        ChannelError::Codec(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        ChannelError::Closed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn rpc_error(context: &str, err: RpcError) -> CliError {
    match err {
        RpcError::Channel(err) => channel_error(context, err),
        RpcError::Transport(err) => transport_error(context, err),
        RpcError::Remote(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        RpcError::UnknownRemoteFunction(_) | RpcError::InvalidArgument(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        RpcError::PeerGone => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        RpcError::UnexpectedEnvelope(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn remote_failures_map_to_distinct_codes() {
        assert_eq!(rpc_error("call", RpcError::Remote(json!("boom"))).code, FAILURE);
        assert_eq!(
            rpc_error("call", RpcError::UnknownRemoteFunction("nope".into())).code,
            USAGE
        );
        assert_eq!(rpc_error("call", RpcError::PeerGone).code, TRANSPORT_ERROR);
    }

    #[test]
    fn nested_io_errors_use_io_mapping() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        let err = RpcError::Transport(TransportError::Connect {
            path: "/tmp/x.sock".into(),
            source: denied,
        });
        assert_eq!(rpc_error("connect", err).code, PERMISSION_DENIED);

        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        let err = RpcError::Transport(TransportError::Connect {
            path: "/tmp/x.sock".into(),
            source: refused,
        });
        assert_eq!(rpc_error("connect", err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn malformed_data_is_data_invalid() {
        let err = RpcError::Channel(ChannelError::Frame(FrameError::PayloadTooLarge {
            size: 10,
            max: 1,
        }));
        assert_eq!(rpc_error("call", err).code, DATA_INVALID);
        assert_eq!(
            rpc_error("call", RpcError::UnexpectedEnvelope("response")).code,
            DATA_INVALID
        );
    }

    #[test]
    fn message_carries_context() {
        let err = rpc_error("call failed", RpcError::PeerGone);
        assert_eq!(err.to_string(), "call failed: peer is gone");
    }
}
