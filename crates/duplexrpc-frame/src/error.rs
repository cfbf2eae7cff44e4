/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The length header announces more than the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream stopped accepting bytes in the middle of a write.
    #[error("connection closed while writing a frame")]
    ConnectionClosed,

    /// End-of-stream arrived with part of a frame buffered.
    #[error("stream ended mid-frame ({buffered} of {expected} bytes)")]
    Truncated { expected: usize, buffered: usize },

    /// End-of-stream was already reported; the reader is finished.
    #[error("frame reader is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
