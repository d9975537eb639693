//! GOP (Group of Pictures) cache for late-joiner support
//!
//! When a new client connects to an existing stream, they need to
//! receive:
//! 1. The latest metadata and sequence headers (SPS/PPS for video,
//!    AudioSpecificConfig for audio)
//! 2. A recent keyframe and all frames that depend on it
//!
//! This allows the decoder to start from the keyframe without waiting
//! for the next one. The cache keeps a bounded ring of complete GOPs;
//! every ring entry starts with a video key frame.
//!
//! The cache stores already-rendered bytes, not raw payloads: the group
//! runs one cache per egress format and feeds each with the lazily
//! rendered form (chunked bytes or FLV tag), so replay is a plain write.

use std::collections::VecDeque;

use bytes::Bytes;

use super::flv;
use crate::protocol::constants::{TYPEID_AUDIO, TYPEID_VIDEO};
use crate::protocol::message::MessageHeader;

/// Cap applied when the ring is configured as unbounded
const UNBOUNDED_GOP_RING_CAP: usize = 8;

/// One group of pictures: a key frame and everything up to the next one
#[derive(Debug, Default)]
struct Gop {
    data: Vec<Bytes>,
}

/// Bounded ring of complete GOPs plus latched stream state
#[derive(Debug)]
pub struct GopCache {
    /// Egress format label, only used in logs
    kind: &'static str,
    unique_key: String,

    /// Ring bound; 0 disables frame caching entirely
    gop_num: usize,

    metadata: Option<Bytes>,
    video_seq_header: Option<Bytes>,
    aac_seq_header: Option<Bytes>,
    gop_ring: VecDeque<Gop>,
}

impl GopCache {
    /// Create a cache with the configured ring size
    ///
    /// `gop_num` 0 disables the ring (headers are still latched), a
    /// negative value means unbounded and is clamped to a concrete cap
    /// to bound memory.
    pub fn new(kind: &'static str, unique_key: &str, gop_num: i32) -> Self {
        let gop_num = match gop_num {
            n if n < 0 => UNBOUNDED_GOP_RING_CAP,
            n => n as usize,
        };
        Self {
            kind,
            unique_key: unique_key.to_string(),
            gop_num,
            metadata: None,
            video_seq_header: None,
            aac_seq_header: None,
            gop_ring: VecDeque::new(),
        }
    }

    /// Classify a message and record its rendered bytes
    ///
    /// The getter is only invoked when the message is actually cached,
    /// so an already-rendered broadcast buffer is shared and a skipped
    /// message costs nothing.
    pub fn feed<F>(&mut self, header: &MessageHeader, payload: &[u8], lazy_get: F)
    where
        F: FnOnce() -> Bytes,
    {
        match header.msg_type_id {
            t if flv::is_metadata(t) => {
                self.metadata = Some(lazy_get());
                tracing::debug!(
                    key = %self.unique_key,
                    kind = self.kind,
                    "GOP cache: metadata updated"
                );
                return;
            }
            TYPEID_VIDEO => {
                if flv::is_video_key_seq_header(payload) {
                    self.video_seq_header = Some(lazy_get());
                    tracing::debug!(
                        key = %self.unique_key,
                        kind = self.kind,
                        "GOP cache: video seq header updated"
                    );
                    return;
                }
            }
            TYPEID_AUDIO => {
                if flv::is_aac_seq_header(payload) {
                    self.aac_seq_header = Some(lazy_get());
                    tracing::debug!(
                        key = %self.unique_key,
                        kind = self.kind,
                        "GOP cache: AAC seq header updated"
                    );
                    return;
                }
            }
            _ => return,
        }

        if self.gop_num == 0 {
            return;
        }

        if header.msg_type_id == TYPEID_VIDEO && flv::is_video_key_nalu(payload) {
            self.feed_new_gop(lazy_get());
        } else {
            self.feed_current_gop(lazy_get);
        }
    }

    /// Latest cached metadata bytes
    pub fn metadata(&self) -> Option<&Bytes> {
        self.metadata.as_ref()
    }

    /// Latest cached video sequence header bytes
    pub fn video_seq_header(&self) -> Option<&Bytes> {
        self.video_seq_header.as_ref()
    }

    /// Latest cached audio sequence header bytes
    pub fn aac_seq_header(&self) -> Option<&Bytes> {
        self.aac_seq_header.as_ref()
    }

    /// Number of complete GOPs currently cached
    pub fn gop_count(&self) -> usize {
        self.gop_ring.len()
    }

    /// Messages of the i-th cached GOP, oldest first
    pub fn gop_at(&self, i: usize) -> &[Bytes] {
        &self.gop_ring[i].data
    }

    /// Drop everything; called when the publisher leaves
    pub fn clear(&mut self) {
        self.metadata = None;
        self.video_seq_header = None;
        self.aac_seq_header = None;
        self.gop_ring.clear();
    }

    fn feed_new_gop(&mut self, data: Bytes) {
        if self.gop_ring.len() == self.gop_num {
            self.gop_ring.pop_front();
        }
        let mut gop = Gop::default();
        gop.data.push(data);
        self.gop_ring.push_back(gop);
    }

    fn feed_current_gop<F>(&mut self, lazy_get: F)
    where
        F: FnOnce() -> Bytes,
    {
        // frames before the first key frame are not replayable, drop them
        if let Some(gop) = self.gop_ring.back_mut() {
            gop.data.push(lazy_get());
        }
    }
}
