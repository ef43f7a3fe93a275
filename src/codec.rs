// ABOUTME: Encodes/decodes a Message to/from its length-prefixed binary payload
// ABOUTME: This is the layer frame.rs checksums and base64-wraps; see frame.rs for the wire envelope

use crate::message::{Message, MessageKind};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Header size: 1 byte kind + 8 byte seqnum + 4 byte data length.
const HEADER_LEN: usize = 1 + 8 + 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("message payload too short: need at least {need} bytes, have {have}")]
    Incomplete { need: usize, have: usize },
    #[error("unknown message kind byte {0}")]
    InvalidKind(u8),
    #[error("declared data length {declared} exceeds remaining payload {remaining}")]
    DataLengthMismatch { declared: u32, remaining: usize },
}

/// Encode a [`Message`] into its binary payload: `Kind(1) | Seqnum(8 BE) | DataLen(4 BE) | Data`.
///
/// This is the payload that `frame::encode` checksums and base64-wraps; it
/// carries no framing of its own.
pub fn encode(msg: &Message) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + msg.data.len());
    buf.put_u8(msg.kind.as_u8());
    buf.put_u64(msg.seqnum);
    buf.put_u32(msg.data.len() as u32);
    buf.put_slice(&msg.data);
    buf.freeze()
}

/// Decode a binary payload produced by [`encode`] back into a [`Message`].
pub fn decode(payload: &[u8]) -> Result<Message, CodecError> {
    if payload.len() < HEADER_LEN {
        return Err(CodecError::Incomplete {
            need: HEADER_LEN,
            have: payload.len(),
        });
    }

    let mut buf = payload;
    let kind_byte = buf.get_u8();
    let kind = MessageKind::from_u8(kind_byte).ok_or(CodecError::InvalidKind(kind_byte))?;
    let seqnum = buf.get_u64();
    let data_len = buf.get_u32() as usize;

    if data_len > buf.remaining() {
        return Err(CodecError::DataLengthMismatch {
            declared: data_len as u32,
            remaining: buf.remaining(),
        });
    }

    let data = Bytes::copy_from_slice(&buf[..data_len]);
    Ok(Message::new(kind, seqnum, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_data_message() {
        let msg = Message::data(7, Bytes::from_static(b"hello"));
        let encoded = encode(&msg);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn round_trips_control_messages_with_empty_payload() {
        for msg in [Message::connect(), Message::ack(3), Message::ackack(), Message::ping()] {
            let encoded = encode(&msg);
            let decoded = decode(&encoded).unwrap();
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn rejects_truncated_header() {
        let err = decode(&[0u8; 5]).unwrap_err();
        assert_eq!(err, CodecError::Incomplete { need: HEADER_LEN, have: 5 });
    }

    #[test]
    fn rejects_unknown_kind() {
        let mut payload = vec![0xEFu8];
        payload.extend_from_slice(&0u64.to_be_bytes());
        payload.extend_from_slice(&0u32.to_be_bytes());
        let err = decode(&payload).unwrap_err();
        assert_eq!(err, CodecError::InvalidKind(0xEF));
    }

    #[test]
    fn rejects_declared_length_past_end_of_payload() {
        let mut payload = vec![MessageKind::Data.as_u8()];
        payload.extend_from_slice(&0u64.to_be_bytes());
        payload.extend_from_slice(&100u32.to_be_bytes());
        payload.extend_from_slice(b"short");
        let err = decode(&payload).unwrap_err();
        assert_eq!(
            err,
            CodecError::DataLengthMismatch { declared: 100, remaining: 5 }
        );
    }

    #[test]
    fn ignores_trailing_bytes_beyond_declared_length() {
        let mut payload = vec![MessageKind::Data.as_u8()];
        payload.extend_from_slice(&3u64.to_be_bytes());
        payload.extend_from_slice(&2u32.to_be_bytes());
        payload.extend_from_slice(b"ab-extra-garbage");
        let decoded = decode(&payload).unwrap();
        assert_eq!(decoded.data, Bytes::from_static(b"ab"));
        assert_eq!(decoded.seqnum, 3);
    }
}
