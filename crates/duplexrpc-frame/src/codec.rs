use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: payload length as a big-endian `u32`.
pub const HEADER_SIZE: usize = 4;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Encode one payload into the wire format.
///
/// ```text
/// ┌────────────────┬──────────────────┐
/// │ Length (4B BE) │ Payload          │
/// │                │ (Length bytes)   │
/// └────────────────┴──────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u32(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Decode one frame from the front of `src`.
///
/// Returns `Ok(None)` while the buffer holds less than a whole frame. On
/// success the frame's bytes are consumed and anything after it is left in
/// `src` for the next call.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    let Some(payload_len) = peek_len(src) else {
        return Ok(None);
    };

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    if src.len() < HEADER_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(payload_len).freeze()))
}

/// Whether `src` starts with a complete frame (or a header `decode_frame` would reject).
pub fn frame_ready(src: &[u8], max_payload: usize) -> bool {
    match peek_len(src) {
        Some(len) => len > max_payload || src.len() >= HEADER_SIZE + len,
        None => false,
    }
}

/// Total frame size announced by the header at the front of `src`, if buffered.
pub(crate) fn announced_size(src: &[u8]) -> Option<usize> {
    peek_len(src).map(|len| HEADER_SIZE + len)
}

fn peek_len(src: &[u8]) -> Option<usize> {
    let header: [u8; HEADER_SIZE] = src.get(..HEADER_SIZE)?.try_into().ok()?;
    Some(u32::from_be_bytes(header) as usize)
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_big_endian_length() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf).unwrap();

        assert_eq!(&buf[..HEADER_SIZE], &[0, 0, 0, 5]);
        assert_eq!(&buf[HEADER_SIZE..], b"hello");
    }

    #[test]
    fn decode_consumes_exactly_one_frame() {
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf).unwrap();
        encode_frame(b"second", &mut buf).unwrap();

        let first = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(first.as_ref(), b"first");
        assert_eq!(buf.len(), HEADER_SIZE + b"second".len());

        let second = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(second.as_ref(), b"second");
        assert!(buf.is_empty());
    }

    #[test]
    fn incomplete_header_waits() {
        let mut buf = BytesMut::from(&[0x00, 0x00, 0x00][..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn incomplete_payload_waits() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), HEADER_SIZE + 2);
    }

    #[test]
    fn oversized_header_rejected_before_payload_arrives() {
        let mut buf = BytesMut::new();
        buf.put_u32(32 * 1024 * 1024);

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(
            result,
            Err(FrameError::PayloadTooLarge { size, .. }) if size == 32 * 1024 * 1024
        ));
    }

    #[test]
    fn empty_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"", &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);

        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn frame_ready_tracks_buffered_bytes() {
        let mut buf = BytesMut::new();
        encode_frame(b"abc", &mut buf).unwrap();

        assert!(!frame_ready(&buf[..2], DEFAULT_MAX_PAYLOAD));
        assert!(!frame_ready(&buf[..HEADER_SIZE + 2], DEFAULT_MAX_PAYLOAD));
        assert!(frame_ready(&buf, DEFAULT_MAX_PAYLOAD));
        assert!(frame_ready(&buf[..HEADER_SIZE], 1));
    }
}
