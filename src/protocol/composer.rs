//! Chunk stream decoder
//!
//! Reassembles interleaved chunks into whole messages and hands each
//! completed message to a callback with its absolute timestamp
//! maintained. State is kept per chunk stream ID, so concurrent message
//! streams inside one connection demultiplex correctly.
//!
//! Chunk layout (Section 5.3.1):
//! ```text
//! +--------------+----------------------+--------------------+---------+
//! | Basic Header | Message Header       | Extended Timestamp | Payload |
//! | (1-3 bytes)  | (0/3/7/11 bytes)     | (0 or 4 bytes)     |         |
//! +--------------+----------------------+--------------------+---------+
//! ```
//!
//! The payload buffer handed to the callback is reused for the next
//! message on the same chunk stream; callers must copy what they keep.

use std::collections::HashMap;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ProtocolError, Result};

use super::constants::{DEFAULT_CHUNK_SIZE, MAX_TIMESTAMP_IN_HEADER, TYPEID_SET_CHUNK_SIZE};
use super::message::MessageHeader;

/// Per-csid reassembly state
#[derive(Debug, Default)]
struct ChunkStream {
    header: MessageHeader,
    payload: BytesMut,
    /// Set when this message's absolute timestamp has already been
    /// established (fmt 0, or an extended delta applied in place), so the
    /// terminal chunk must not add the delta again.
    delta_applied: bool,
}

/// Stateful chunk-to-message decoder
///
/// One composer per connection direction. `run_loop` blocks on the
/// reader and invokes the callback synchronously for every completed
/// message. Any I/O error or structural violation terminates the loop
/// and the composer must not be reused afterwards.
pub struct ChunkComposer {
    peer_chunk_size: u32,
    csid2stream: HashMap<u32, ChunkStream>,
}

impl ChunkComposer {
    pub fn new() -> Self {
        Self {
            peer_chunk_size: DEFAULT_CHUNK_SIZE,
            csid2stream: HashMap::new(),
        }
    }

    /// Override the peer chunk size, e.g. when it was negotiated before
    /// this composer took over the connection
    pub fn set_peer_chunk_size(&mut self, val: u32) {
        self.peer_chunk_size = val;
    }

    /// Read chunks until the source fails, invoking `on_message` for
    /// every reassembled message
    ///
    /// SetChunkSize control messages (type 1) are applied to subsequent
    /// payload slicing before being passed on to the callback like any
    /// other message.
    pub async fn run_loop<R, F>(&mut self, reader: &mut R, mut on_message: F) -> Result<()>
    where
        R: AsyncRead + Unpin,
        F: FnMut(&MessageHeader, &[u8]) -> Result<()>,
    {
        let mut bootstrap = [0u8; 11];

        loop {
            // 5.3.1.1 Basic Header: fmt and (possibly extended) csid
            reader.read_exact(&mut bootstrap[..1]).await?;
            let fmt = (bootstrap[0] >> 6) & 0x03;
            let mut csid = u32::from(bootstrap[0] & 0x3f);

            match csid {
                0 => {
                    reader.read_exact(&mut bootstrap[..1]).await?;
                    csid = 64 + u32::from(bootstrap[0]);
                }
                1 => {
                    reader.read_exact(&mut bootstrap[..2]).await?;
                    csid = 64 + u32::from(bootstrap[0]) + u32::from(bootstrap[1]) * 256;
                }
                _ => {}
            }

            let stream = self.csid2stream.entry(csid).or_default();

            // 5.3.1.2 Message Header, variable size depending on fmt
            match fmt {
                0 => {
                    reader.read_exact(&mut bootstrap[..11]).await?;
                    stream.header.timestamp = be_u24(&bootstrap);
                    stream.header.timestamp_abs = stream.header.timestamp;
                    stream.delta_applied = true;
                    stream.header.msg_len = be_u24(&bootstrap[3..]);
                    stream.header.msg_type_id = bootstrap[6];
                    stream.header.msg_stream_id = le_u32(&bootstrap[7..]) as i32;

                    stream.payload.reserve(stream.header.msg_len as usize);
                }
                1 => {
                    reader.read_exact(&mut bootstrap[..7]).await?;
                    // relative timestamp, applied once per message below
                    stream.header.timestamp = be_u24(&bootstrap);
                    stream.header.msg_len = be_u24(&bootstrap[3..]);
                    stream.header.msg_type_id = bootstrap[6];

                    stream.payload.reserve(stream.header.msg_len as usize);
                }
                2 => {
                    reader.read_exact(&mut bootstrap[..3]).await?;
                    stream.header.timestamp = be_u24(&bootstrap);
                }
                _ => {}
            }

            // 5.3.1.3 Extended Timestamp. Some producers keep sending the
            // 4-byte field on fmt-3 continuations after an extended
            // timestamp, so the sentinel comparison is `>=` rather than
            // `==`.
            if stream.header.timestamp >= MAX_TIMESTAMP_IN_HEADER {
                reader.read_exact(&mut bootstrap[..4]).await?;
                let ext = u32::from_be_bytes([bootstrap[0], bootstrap[1], bootstrap[2], bootstrap[3]]);
                stream.header.timestamp = ext;
                match fmt {
                    0 => {
                        stream.header.timestamp_abs = ext;
                    }
                    1 | 2 => {
                        // the sentinel already sat in the delta field; the
                        // effective delta is what the extended field adds
                        // beyond it
                        stream.header.timestamp_abs = stream
                            .header
                            .timestamp_abs
                            .wrapping_sub(MAX_TIMESTAMP_IN_HEADER)
                            .wrapping_add(ext);
                        stream.delta_applied = true;
                    }
                    _ => {}
                }
            }

            // payload slice of this chunk
            let needed = if stream.header.msg_len <= self.peer_chunk_size {
                stream.header.msg_len
            } else {
                let accumulated = stream.payload.len() as u32;
                let remaining = stream.header.msg_len.checked_sub(accumulated).ok_or(
                    ProtocolError::LengthOverrun {
                        accumulated,
                        declared: stream.header.msg_len,
                    },
                )?;
                remaining.min(self.peer_chunk_size)
            };

            let start = stream.payload.len();
            stream.payload.resize(start + needed as usize, 0);
            reader.read_exact(&mut stream.payload[start..]).await?;

            if (stream.payload.len() as u32) > stream.header.msg_len {
                return Err(ProtocolError::LengthOverrun {
                    accumulated: stream.payload.len() as u32,
                    declared: stream.header.msg_len,
                }
                .into());
            }

            if stream.payload.len() as u32 == stream.header.msg_len {
                if stream.header.msg_type_id == TYPEID_SET_CHUNK_SIZE {
                    if stream.payload.len() < 4 {
                        return Err(ProtocolError::ControlTooShort {
                            type_id: TYPEID_SET_CHUNK_SIZE,
                            len: stream.payload.len(),
                        }
                        .into());
                    }
                    self.peer_chunk_size = u32::from_be_bytes([
                        stream.payload[0],
                        stream.payload[1],
                        stream.payload[2],
                        stream.payload[3],
                    ]);
                }

                stream.header.csid = csid;
                if !stream.delta_applied {
                    // the delta counts once per message, on the terminal
                    // chunk
                    stream.header.timestamp_abs = stream
                        .header
                        .timestamp_abs
                        .wrapping_add(stream.header.timestamp);
                }
                stream.delta_applied = false;

                on_message(&stream.header, &stream.payload)?;
                stream.payload.clear();
            }
        }
    }
}

impl Default for ChunkComposer {
    fn default() -> Self {
        Self::new()
    }
}

fn be_u24(b: &[u8]) -> u32 {
    (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2])
}

fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}
