//! Selectable, bidirectional message channels.
//!
//! A channel moves discrete values between two processes or threads:
//! - [`Pipe`]: a duplex pair of OS pipes, created before the two sides
//!   separate and then claimed as [`Side::Left`] or [`Side::Right`]
//! - [`StreamChannel`]: a connected Unix domain socket
//!
//! Both frame each message with the length-prefixed format from
//! `duplexrpc-frame` and encode values with a pluggable [`ValueCodec`].
//! Channels expose their read descriptor through [`Selectable`] so that
//! [`select`] can wait on several of them at once.

pub mod channel;
pub mod error;
pub mod pipe;
pub mod select;
pub mod stream;
pub mod value;

pub use channel::{MessageChannel, Selectable};
pub use error::{ChannelError, Result};
pub use pipe::{HalfRole, Pipe, Side, UniPipe};
pub use select::select;
pub use stream::StreamChannel;
pub use value::{CodecError, JsonCodec, ValueCodec};
