//! Lazy per-broadcast renderers
//!
//! A broadcast touches many subscribers but each egress form should be
//! rendered at most once. Both wrappers render on first `get()` and hand
//! out the same reference-counted buffer afterwards; nobody may mutate
//! the bytes once rendered.

use bytes::Bytes;

use crate::media::flv;
use crate::protocol::constants::LOCAL_CHUNK_SIZE;
use crate::protocol::divider::message_to_chunks;
use crate::protocol::message::MessageHeader;

/// Chunk-stream rendering of one outbound message, computed on demand
pub struct LazyChunkDivider<'a> {
    header: &'a MessageHeader,
    payload: &'a [u8],
    cached: Option<Bytes>,
}

impl<'a> LazyChunkDivider<'a> {
    pub fn new(header: &'a MessageHeader, payload: &'a [u8]) -> Self {
        Self {
            header,
            payload,
            cached: None,
        }
    }

    pub fn get(&mut self) -> Bytes {
        self.cached
            .get_or_insert_with(|| {
                message_to_chunks(self.header, self.payload, LOCAL_CHUNK_SIZE)
            })
            .clone()
    }
}

/// FLV tag rendering of one inbound message, computed on demand
pub struct LazyFlvTag<'a> {
    msg_type_id: u8,
    timestamp_abs: u32,
    payload: &'a [u8],
    cached: Option<Bytes>,
}

impl<'a> LazyFlvTag<'a> {
    pub fn new(msg_type_id: u8, timestamp_abs: u32, payload: &'a [u8]) -> Self {
        Self {
            msg_type_id,
            timestamp_abs,
            payload,
            cached: None,
        }
    }

    pub fn get(&mut self) -> Bytes {
        self.cached
            .get_or_insert_with(|| flv::pack_tag(self.msg_type_id, self.timestamp_abs, self.payload))
            .clone()
    }
}
