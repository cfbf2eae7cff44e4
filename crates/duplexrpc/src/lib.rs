//! Reentrant point-to-point RPC over selectable pipes and Unix sockets.
//!
//! Two processes (or threads) that share a channel call named functions on
//! each other. A synchronous call keeps servicing the peer's calls while it
//! waits, so callbacks nest to any depth in either direction.
//!
//! # Crate Structure
//!
//! - [`transport`]: OS byte transports (Unix sockets, pipes, `poll(2)`)
//! - [`frame`]: 4-byte big-endian length-prefixed framing
//! - [`channel`]: message channels, value codecs and `select`
//! - [`rpc`]: envelopes, dispatcher and socket bindings (behind `rpc` feature)

/// Re-export transport types.
pub mod transport {
    pub use duplexrpc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use duplexrpc_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use duplexrpc_channel::*;
}

/// Re-export RPC types (requires `rpc` feature).
#[cfg(feature = "rpc")]
pub mod rpc {
    pub use duplexrpc_rpc::*;
}
