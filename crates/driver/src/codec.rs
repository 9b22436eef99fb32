//! Serialization of the shared segment list: each id as a fixed 8-byte
//! big-endian integer, concatenated in list order. No header, no checksum;
//! the format must round-trip exactly.

use bytes::{BufMut, Bytes, BytesMut};
use chainlog_segment::SegmentId;
use thiserror::Error;

/// The stored segment list payload is malformed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("segment list payload length {len} is not a multiple of 8")]
pub struct CorruptMetadata {
    /// Length of the rejected payload.
    pub len: usize,
}

/// Encodes a segment list for storage in the metadata store.
#[must_use]
pub fn encode_segment_list(list: &[SegmentId]) -> Bytes {
    let mut buf = BytesMut::with_capacity(list.len() * 8);

    for id in list {
        buf.put_u64(id.0);
    }

    buf.freeze()
}

/// Decodes a segment list payload read from the metadata store.
pub fn decode_segment_list(bytes: &[u8]) -> Result<Vec<SegmentId>, CorruptMetadata> {
    if bytes.len() % 8 != 0 {
        return Err(CorruptMetadata { len: bytes.len() });
    }

    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            SegmentId(u64::from_be_bytes(raw))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let list = vec![SegmentId(1), SegmentId(7), SegmentId(42)];

        let encoded = encode_segment_list(&list);
        assert_eq!(encoded.len(), 24);

        let decoded = decode_segment_list(&encoded).unwrap();
        assert_eq!(decoded, list);
    }

    #[test]
    fn test_empty_list() {
        let encoded = encode_segment_list(&[]);
        assert!(encoded.is_empty());
        assert_eq!(decode_segment_list(&encoded).unwrap(), Vec::new());
    }

    #[test]
    fn test_big_endian_layout() {
        let encoded = encode_segment_list(&[SegmentId(0x0102_0304_0506_0708)]);
        assert_eq!(&encoded[..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_ragged_payload_is_rejected() {
        let err = decode_segment_list(&[0u8; 12]).unwrap_err();
        assert_eq!(err, CorruptMetadata { len: 12 });
    }
}
