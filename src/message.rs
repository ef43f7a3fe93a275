// ABOUTME: The Message type exchanged between Link and Session, and its wire-kind tag

use bytes::Bytes;
use num_enum::TryFromPrimitive;

/// The five message kinds this protocol exchanges, encoded as a single byte
/// on the wire.
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Connect = 0,
    Ack = 1,
    AckAck = 2,
    Ping = 3,
    Data = 4,
}

impl MessageKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        Self::try_from(v).ok()
    }
}

/// A single protocol message: a kind tag, a sequence number, and payload bytes.
///
/// Sequence numbers are meaningful only for `Data` (stop-and-wait ordering);
/// other kinds carry `0` and ignore it on receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub seqnum: u64,
    pub data: Bytes,
}

impl Message {
    pub fn new(kind: MessageKind, seqnum: u64, data: Bytes) -> Self {
        Self { kind, seqnum, data }
    }

    pub fn connect() -> Self {
        Self::new(MessageKind::Connect, 0, Bytes::new())
    }

    /// `seqnum` identifies the `Data` message this ack acknowledges, so a
    /// stop-and-wait writer can tell a fresh ack from a stale one left over
    /// from an earlier retransmit.
    pub fn ack(seqnum: u64) -> Self {
        Self::new(MessageKind::Ack, seqnum, Bytes::new())
    }

    pub fn ackack() -> Self {
        Self::new(MessageKind::AckAck, 0, Bytes::new())
    }

    pub fn ping() -> Self {
        Self::new(MessageKind::Ping, 0, Bytes::new())
    }

    pub fn data(seqnum: u64, data: Bytes) -> Self {
        Self::new(MessageKind::Data, seqnum, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrips_through_u8() {
        for kind in [
            MessageKind::Connect,
            MessageKind::Ack,
            MessageKind::AckAck,
            MessageKind::Ping,
            MessageKind::Data,
        ] {
            assert_eq!(MessageKind::from_u8(kind.as_u8()), Some(kind));
        }
    }

    #[test]
    fn unknown_kind_byte_is_none() {
        assert_eq!(MessageKind::from_u8(42), None);
    }

    #[test]
    fn control_message_constructors_carry_no_payload() {
        assert_eq!(Message::connect().data.len(), 0);
        assert_eq!(Message::ping().kind, MessageKind::Ping);
    }

    #[test]
    fn ack_carries_the_seqnum_it_acknowledges() {
        assert_eq!(Message::ack(7).seqnum, 7);
    }
}
