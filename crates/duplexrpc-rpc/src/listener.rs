use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use duplexrpc_channel::{JsonCodec, StreamChannel};
use duplexrpc_frame::FrameConfig;
use duplexrpc_transport::UnixDomainSocket;
use tracing::debug;

use crate::connector::RpcSocket;
use crate::dispatcher::Rpc;
use crate::error::Result;
use crate::handler::{Call, Handler, HandlerResult};

/// Accepts RPC peers on a Unix domain socket.
///
/// Handlers registered on the listener are installed into every accepted
/// endpoint; each endpoint can still add its own afterwards.
pub struct RpcListener {
    socket: UnixDomainSocket,
    handlers: HashMap<String, Handler<StreamChannel>>,
    frame_config: FrameConfig,
    accepted: AtomicU64,
}

impl RpcListener {
    /// Bind to a Unix domain socket path.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_socket(UnixDomainSocket::bind(path)?))
    }

    /// Bind with explicit socket file permissions.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        Ok(Self::from_socket(UnixDomainSocket::bind_with_mode(path, mode)?))
    }

    fn from_socket(socket: UnixDomainSocket) -> Self {
        Self {
            socket,
            handlers: HashMap::new(),
            frame_config: FrameConfig::default(),
            accepted: AtomicU64::new(0),
        }
    }

    /// Register a handler for every peer accepted from now on.
    pub fn with_handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut RpcSocket, Call) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Override the frame configuration of accepted peers.
    pub fn with_frame_config(mut self, config: FrameConfig) -> Self {
        self.frame_config = config;
        self
    }

    /// Accept the next peer (blocking).
    pub fn accept(&self) -> Result<RpcSocket> {
        let stream = self.socket.accept()?;
        let channel = StreamChannel::with_codec(stream, JsonCodec, self.frame_config.clone())?;
        let peer = self.accepted.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(peer, "accepted rpc peer");
        Ok(Rpc::from_parts(channel, self.handlers.clone()))
    }

    /// Number of peers accepted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        self.socket.path()
    }
}
