//! FLV semantics of audio/video message payloads
//!
//! RTMP audio/video messages are FLV tag bodies without the tag header.
//! The first byte (or two) of a body is enough to classify a message for
//! caching: frame type and codec id for video, sound format and packet
//! type for audio.
//!
//! ```text
//! Video body: | FrameType (4 bits) | CodecID (4 bits) | AVCPacketType (1) | ...
//! Audio body: | SoundFormat (4 bits) | rate/size/type (4 bits) | AACPacketType (1) | ...
//! ```
//!
//! This module also packs message payloads back into complete FLV tags
//! for the HTTP-FLV egress.

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::constants::{TYPEID_AUDIO, TYPEID_DATA_MESSAGE_AMF0, TYPEID_VIDEO};

/// FLV tag header size (type + data size + timestamp + stream id)
pub const TAG_HEADER_SIZE: usize = 11;

/// Trailing previous-tag-size field
pub const PREV_TAG_SIZE_FIELD_SIZE: usize = 4;

/// Video frame type (upper nibble of the first video byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFrameType {
    Keyframe = 1,
    InterFrame = 2,
    DisposableInterFrame = 3,
    GeneratedKeyframe = 4,
    VideoInfoFrame = 5,
}

impl VideoFrameType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match (b >> 4) & 0x0F {
            1 => Some(VideoFrameType::Keyframe),
            2 => Some(VideoFrameType::InterFrame),
            3 => Some(VideoFrameType::DisposableInterFrame),
            4 => Some(VideoFrameType::GeneratedKeyframe),
            5 => Some(VideoFrameType::VideoInfoFrame),
            _ => None,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(
            self,
            VideoFrameType::Keyframe | VideoFrameType::GeneratedKeyframe
        )
    }
}

/// Video codec ID (lower nibble of the first video byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    SorensonH263 = 2,
    ScreenVideo = 3,
    Vp6 = 4,
    Vp6Alpha = 5,
    ScreenVideoV2 = 6,
    Avc = 7,
    Hevc = 12,
    Av1 = 13,
}

impl VideoCodec {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b & 0x0F {
            2 => Some(VideoCodec::SorensonH263),
            3 => Some(VideoCodec::ScreenVideo),
            4 => Some(VideoCodec::Vp6),
            5 => Some(VideoCodec::Vp6Alpha),
            6 => Some(VideoCodec::ScreenVideoV2),
            7 => Some(VideoCodec::Avc),
            12 => Some(VideoCodec::Hevc),
            13 => Some(VideoCodec::Av1),
            _ => None,
        }
    }
}

/// Audio sound format (upper nibble of the first audio byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3 = 2,
    Aac = 10,
    Speex = 11,
}

impl AudioFormat {
    pub fn from_byte(b: u8) -> Option<Self> {
        match (b >> 4) & 0x0F {
            2 => Some(AudioFormat::Mp3),
            10 => Some(AudioFormat::Aac),
            11 => Some(AudioFormat::Speex),
            _ => None,
        }
    }
}

/// Whether a message of this type carries stream metadata
pub fn is_metadata(msg_type_id: u8) -> bool {
    msg_type_id == TYPEID_DATA_MESSAGE_AMF0
}

/// AVC sequence header: keyframe + AVC codec + packet type 0
pub fn is_video_key_seq_header(payload: &[u8]) -> bool {
    payload.len() >= 2
        && VideoFrameType::from_byte(payload[0]).is_some_and(|t| t.is_keyframe())
        && VideoCodec::from_byte(payload[0]) == Some(VideoCodec::Avc)
        && payload[1] == 0
}

/// Key frame carrying actual NAL units (not codec config)
pub fn is_video_key_nalu(payload: &[u8]) -> bool {
    payload.len() >= 2
        && VideoFrameType::from_byte(payload[0]).is_some_and(|t| t.is_keyframe())
        && payload[1] == 1
}

/// AAC sequence header: AAC sound format + packet type 0
pub fn is_aac_seq_header(payload: &[u8]) -> bool {
    payload.len() >= 2
        && AudioFormat::from_byte(payload[0]) == Some(AudioFormat::Aac)
        && payload[1] == 0
}

/// Pack a message payload into a complete FLV tag
///
/// Tag type values coincide with the message type IDs for audio, video
/// and script data, so the inbound type id is written through.
pub fn pack_tag(msg_type_id: u8, timestamp_abs: u32, payload: &[u8]) -> Bytes {
    debug_assert!(matches!(
        msg_type_id,
        TYPEID_AUDIO | TYPEID_VIDEO | TYPEID_DATA_MESSAGE_AMF0
    ));

    let mut buf =
        BytesMut::with_capacity(TAG_HEADER_SIZE + payload.len() + PREV_TAG_SIZE_FIELD_SIZE);

    buf.put_u8(msg_type_id);
    put_u24(&mut buf, payload.len() as u32);
    put_u24(&mut buf, timestamp_abs & 0x00FF_FFFF);
    buf.put_u8((timestamp_abs >> 24) as u8);
    put_u24(&mut buf, 0); // stream id, always 0
    buf.put_slice(payload);
    buf.put_u32((TAG_HEADER_SIZE + payload.len()) as u32);

    buf.freeze()
}

fn put_u24(buf: &mut BytesMut, val: u32) {
    buf.put_u8((val >> 16) as u8);
    buf.put_u8((val >> 8) as u8);
    buf.put_u8(val as u8);
}
