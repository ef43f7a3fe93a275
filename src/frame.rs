//! Wire framing: wraps a codec payload in a checksum and a self-delimiting envelope.
//!
//! A frame is `base64(adler32(payload) ++ payload)` followed by a `~`
//! delimiter byte. The delimiter lets a reader pull exactly one frame out of
//! a streaming source without knowing its length up front; the checksum
//! catches corruption introduced by the unreliable carrier underneath.

use crate::codec::{self, CodecError};
use crate::message::Message;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// Byte that terminates every frame on the wire.
pub const DELIMITER: u8 = b'~';

const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum FrameError {
    /// No delimiter has been seen yet; caller should read more bytes.
    #[error("incomplete frame: no delimiter yet")]
    Incomplete,

    #[error("invalid base64 in frame: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("frame shorter than checksum: got {0} bytes, need at least {CHECKSUM_LEN}")]
    TooShort(usize),

    #[error("checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    #[error("malformed message payload: {0}")]
    Codec(#[from] CodecError),
}

/// Encode a message into its on-wire frame, including the trailing delimiter.
pub fn encode(msg: &Message) -> Vec<u8> {
    let payload = codec::encode(msg);
    let checksum = adler::adler32_slice(&payload);

    let mut checksummed = Vec::with_capacity(CHECKSUM_LEN + payload.len());
    checksummed.extend_from_slice(&checksum.to_be_bytes());
    checksummed.extend_from_slice(&payload);

    let mut out = STANDARD.encode(&checksummed).into_bytes();
    out.push(DELIMITER);
    out
}

/// Decode a single frame's bytes, *not* including the trailing delimiter.
///
/// Callers are expected to have already split the frame out of a stream at
/// the `~` boundary (see [`crate::link::Link`]); this function does the
/// base64/checksum/codec work on the slice between delimiters.
pub fn decode(frame: &[u8]) -> Result<Message, FrameError> {
    let checksummed = STANDARD.decode(frame)?;

    if checksummed.len() < CHECKSUM_LEN {
        return Err(FrameError::TooShort(checksummed.len()));
    }

    let (checksum_bytes, payload) = checksummed.split_at(CHECKSUM_LEN);
    let expected = u32::from_be_bytes(checksum_bytes.try_into().unwrap());
    let computed = adler::adler32_slice(payload);
    if expected != computed {
        return Err(FrameError::ChecksumMismatch { expected, computed });
    }

    Ok(codec::decode(payload)?)
}

/// Scan `buf` for the first [`DELIMITER`] and split the frame (without the
/// delimiter) off the front, returning the decoded message and the number of
/// bytes consumed (including the delimiter itself). Returns `None` if no
/// delimiter is present yet.
pub fn extract(buf: &[u8]) -> Option<Result<(Message, usize), FrameError>> {
    let pos = buf.iter().position(|&b| b == DELIMITER)?;
    let consumed = pos + 1;
    Some(decode(&buf[..pos]).map(|msg| (msg, consumed)))
}
