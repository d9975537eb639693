//! Chunk stream encoder
//!
//! Slices an outgoing message into a fmt-0 chunk followed by fmt-3
//! continuations. When the absolute timestamp does not fit the 24-bit
//! field, the 4-byte extended timestamp is written after every chunk
//! header of the message, continuations included, matching what
//! real-world decoders expect.

use bytes::{BufMut, Bytes, BytesMut};

use super::constants::MAX_TIMESTAMP_IN_HEADER;
use super::message::MessageHeader;

/// Encode a whole message as chunk-stream bytes
pub fn message_to_chunks(header: &MessageHeader, payload: &[u8], chunk_size: u32) -> Bytes {
    let chunk_size = chunk_size as usize;
    let needs_ext = header.timestamp_abs >= MAX_TIMESTAMP_IN_HEADER;
    let num_chunks = payload.len().div_ceil(chunk_size).max(1);

    let mut buf = BytesMut::with_capacity(payload.len() + num_chunks * 18);

    let mut offset = 0;
    let mut first = true;
    loop {
        if first {
            put_basic_header(&mut buf, 0, header.csid);
            // 11-byte message header
            if needs_ext {
                put_u24(&mut buf, MAX_TIMESTAMP_IN_HEADER);
            } else {
                put_u24(&mut buf, header.timestamp_abs);
            }
            put_u24(&mut buf, payload.len() as u32);
            buf.put_u8(header.msg_type_id);
            buf.put_u32_le(header.msg_stream_id as u32);
        } else {
            put_basic_header(&mut buf, 3, header.csid);
        }
        if needs_ext {
            buf.put_u32(header.timestamp_abs);
        }

        let end = (offset + chunk_size).min(payload.len());
        buf.put_slice(&payload[offset..end]);
        offset = end;
        first = false;

        if offset >= payload.len() {
            break;
        }
    }

    buf.freeze()
}

fn put_basic_header(buf: &mut BytesMut, fmt: u8, csid: u32) {
    match csid {
        0..=63 => buf.put_u8((fmt << 6) | csid as u8),
        64..=319 => {
            buf.put_u8(fmt << 6);
            buf.put_u8((csid - 64) as u8);
        }
        _ => {
            buf.put_u8((fmt << 6) | 1);
            let rest = csid - 64;
            buf.put_u8((rest % 256) as u8);
            buf.put_u8((rest / 256) as u8);
        }
    }
}

fn put_u24(buf: &mut BytesMut, val: u32) {
    buf.put_u8((val >> 16) as u8);
    buf.put_u8((val >> 8) as u8);
    buf.put_u8(val as u8);
}
