//! HLS muxer boundary
//!
//! Segment writing lives outside this crate. The group drives the muxer
//! lifecycle: created and started when a publisher attaches, fed one raw
//! message per broadcast, disposed when the publisher leaves.

use crate::protocol::message::MessageHeader;

/// One muxer instance bound to a single stream
pub trait HlsMuxer: Send {
    /// Called once before the first `feed`
    fn start(&mut self);

    /// Consume one message; the muxer copies what it keeps
    fn feed(&mut self, header: &MessageHeader, payload: &[u8]);

    /// Flush and release; no calls follow
    fn dispose(&mut self);
}

/// Creates muxers on publisher attach
pub trait HlsMuxerFactory: Send + Sync {
    fn create(&self, stream_name: &str) -> Box<dyn HlsMuxer>;
}
