//! Message header types and the outbound header translator

use super::constants::*;

/// Header of a complete chunk-protocol message
///
/// `timestamp` holds the raw value of the most recent 24-bit (or
/// extended) timestamp field for this chunk stream; `timestamp_abs` is
/// the maintained absolute presentation time in milliseconds. Consumers
/// should only ever look at `timestamp_abs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeader {
    /// Chunk stream ID the message arrived on (or will leave on)
    pub csid: u32,

    /// Raw timestamp field of the last chunk header (delta for fmt 1/2)
    pub timestamp: u32,

    /// Absolute timestamp in milliseconds (32-bit, wrap permitted)
    pub timestamp_abs: u32,

    /// Declared message length in bytes
    pub msg_len: u32,

    /// Message type ID
    pub msg_type_id: u8,

    /// Message stream ID (little-endian on the wire)
    pub msg_stream_id: i32,
}

impl MessageHeader {
    /// Whether this message is audio or video
    pub fn is_av(&self) -> bool {
        self.msg_type_id == TYPEID_AUDIO || self.msg_type_id == TYPEID_VIDEO
    }
}

/// Build the default outbound header for re-chunking an inbound message
///
/// Type and message-stream-id are copied, the length is taken from the
/// actual payload, the timestamp stays absolute. The outgoing csid is
/// chosen by message class so that audio, video and data each get their
/// own chunk stream towards the subscriber.
pub fn make_default_header(inbound: &MessageHeader, payload_len: usize) -> MessageHeader {
    let csid = match inbound.msg_type_id {
        TYPEID_AUDIO => CSID_AUDIO,
        TYPEID_VIDEO => CSID_VIDEO,
        TYPEID_DATA_MESSAGE_AMF0 => CSID_AMF,
        _ => CSID_PROTOCOL_CONTROL,
    };
    MessageHeader {
        csid,
        timestamp: inbound.timestamp,
        timestamp_abs: inbound.timestamp_abs,
        msg_len: payload_len as u32,
        msg_type_id: inbound.msg_type_id,
        msg_stream_id: inbound.msg_stream_id,
    }
}
