//! Relay boundary traits
//!
//! The hub decides *when* to pull from an origin or push to an edge;
//! the transport layer decides *how*. A `RelayDialer` implementation
//! performs the wire-level connect/handshake and returns a live session
//! handle whose done signal fires when the connection ends.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::message::MessageHeader;

use super::session::MediaSession;

/// Capability a media source calls into for every complete message
///
/// The group implements this; publisher and pull sessions hold it as a
/// weak back-reference. The group owns the session, never the other
/// way around.
pub trait MessageObserver: Send + Sync {
    /// Called synchronously per reassembled message. The payload buffer
    /// is only valid for the duration of the call.
    fn on_read(&self, header: &MessageHeader, payload: &[u8]);
}

/// Timeouts applied to one relay-push attempt
#[derive(Debug, Clone, Copy)]
pub struct PushTimeouts {
    pub connect_timeout_ms: u64,
    pub push_timeout_ms: u64,
    pub write_av_timeout_ms: u64,
}

/// Wire-level connector for relay sessions
#[async_trait]
pub trait RelayDialer: Send + Sync {
    /// Connect to `url` and start pulling; every received message is
    /// delivered to the observer until the session ends
    async fn dial_pull(
        &self,
        url: &str,
        observer: Arc<dyn MessageObserver>,
    ) -> Result<Arc<MediaSession>>;

    /// Connect to `url` and start pushing; the caller feeds the returned
    /// session's write queue
    async fn dial_push(&self, url: &str, timeouts: PushTimeouts) -> Result<Arc<MediaSession>>;
}
