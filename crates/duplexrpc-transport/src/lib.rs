//! Byte transports for duplexrpc.
//!
//! Thin wrappers over the local OS primitives the upper layers run on:
//! - Unix domain sockets ([`UnixDomainSocket`], [`IpcStream`])
//! - anonymous OS pipes ([`pipe()`])
//! - readiness multiplexing over any set of descriptors ([`poll::wait_readable`])
//!
//! This is the lowest layer of duplexrpc. Nothing here knows about messages;
//! framing lives in `duplexrpc-frame`.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod pipe;
#[cfg(unix)]
pub mod poll;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use traits::IpcStream;

#[cfg(unix)]
pub use pipe::{pipe, PipeReader, PipeWriter};
#[cfg(unix)]
pub use poll::wait_readable;
#[cfg(unix)]
pub use uds::UnixDomainSocket;
