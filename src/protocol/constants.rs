//! Chunk protocol constants
//!
//! Reference: RTMP Specification Sections 5.3, 5.4

/// Initial chunk size both peers start with, until a SetChunkSize arrives
pub const DEFAULT_CHUNK_SIZE: u32 = 128;

/// Chunk size this server announces for its own outgoing chunk streams
pub const LOCAL_CHUNK_SIZE: u32 = 4096;

/// Largest value the 24-bit timestamp field can carry; at or beyond this
/// the 4-byte extended timestamp field is present
pub const MAX_TIMESTAMP_IN_HEADER: u32 = 0xFF_FF_FF;

/// Message type IDs (Section 5.4 / 7.1)
pub const TYPEID_SET_CHUNK_SIZE: u8 = 1;
pub const TYPEID_ABORT: u8 = 2;
pub const TYPEID_ACK: u8 = 3;
pub const TYPEID_USER_CONTROL: u8 = 4;
pub const TYPEID_WIN_ACK_SIZE: u8 = 5;
pub const TYPEID_SET_PEER_BANDWIDTH: u8 = 6;
pub const TYPEID_AUDIO: u8 = 8;
pub const TYPEID_VIDEO: u8 = 9;
pub const TYPEID_DATA_MESSAGE_AMF0: u8 = 18;
pub const TYPEID_COMMAND_MESSAGE_AMF0: u8 = 20;

/// Outgoing chunk stream IDs, one per message class
pub const CSID_PROTOCOL_CONTROL: u32 = 2;
pub const CSID_AMF: u32 = 5;
pub const CSID_AUDIO: u32 = 6;
pub const CSID_VIDEO: u32 = 7;

/// Message stream ID used for all server-originated media
pub const MSID1: i32 = 1;
