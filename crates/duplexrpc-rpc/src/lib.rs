//! Point-to-point RPC over a selectable message channel.
//!
//! An [`Rpc`] endpoint wraps one channel and a table of named handlers.
//! It issues calls to its peer and services the peer's calls over the same
//! channel:
//! - [`Rpc::sync_call`] blocks until the peer answers, dispatching any
//!   requests the peer makes in the meantime
//! - [`Rpc::async_call`] returns as soon as the request is written
//! - [`Rpc::execute`] and [`Rpc::serve`] handle incoming requests
//!
//! Handlers get `&mut Rpc`, so they can call back into the peer before
//! returning. Failures come back as [`RpcError::UnknownRemoteFunction`] or
//! [`RpcError::Remote`].

pub mod call;
pub mod connector;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod listener;

pub use call::CallBuilder;
pub use connector::{connect, connect_with_config, RpcSocket};
pub use dispatcher::Rpc;
pub use envelope::{Envelope, ErrorKind};
pub use error::{Result, RpcError};
pub use handler::{Call, Handler, HandlerError, HandlerResult};
pub use listener::RpcListener;

/// An RPC endpoint over a duplex OS pipe pair.
pub type RpcPipe = Rpc<duplexrpc_channel::Pipe>;
