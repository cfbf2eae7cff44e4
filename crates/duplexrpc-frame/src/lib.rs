//! Length-prefixed message framing.
//!
//! Every message on a byte stream is framed as a 4-byte big-endian payload
//! length followed by exactly that many payload bytes. Readers only ever hand
//! out whole payloads; partial reads and leftover bytes stay inside
//! [`FrameReader`].

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, frame_ready, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
