use std::path::Path;

use duplexrpc_channel::{JsonCodec, StreamChannel};
use duplexrpc_frame::FrameConfig;
use duplexrpc_transport::UnixDomainSocket;
use tracing::debug;

use crate::dispatcher::Rpc;
use crate::error::Result;

/// An RPC endpoint over a Unix domain socket.
pub type RpcSocket = Rpc<StreamChannel>;

/// Connect to a listening RPC endpoint.
pub fn connect(path: impl AsRef<Path>) -> Result<RpcSocket> {
    connect_with_config(path, FrameConfig::default())
}

/// Connect with an explicit frame configuration.
pub fn connect_with_config(path: impl AsRef<Path>, config: FrameConfig) -> Result<RpcSocket> {
    let path = path.as_ref();
    let stream = UnixDomainSocket::connect(path)?;
    debug!(?path, "connected rpc socket");
    let channel = StreamChannel::with_codec(stream, JsonCodec, config)?;
    Ok(Rpc::new(channel))
}
