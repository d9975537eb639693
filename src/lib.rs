//! # livehub
//!
//! Core of a live media streaming server: ingest real-time audio/video
//! from RTMP publishers, fan it out to RTMP and HTTP-FLV subscribers
//! with GOP-cached instant startup, feed an HLS muxer in parallel, and
//! relay streams between peers (pull-from-origin, push-to-edges).
//!
//! The crate deliberately stops at the transport boundary: it frames and
//! routes messages but performs no socket I/O itself. The transport
//! layer feeds bytes into a [`protocol::ChunkComposer`], forwards the
//! reassembled messages to a [`hub::Group`], and drains per-session
//! write queues back to the wire.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use livehub::hub::{GroupStore, GroupConfig, MediaSession, SessionRole, StreamKey};
//! use livehub::protocol::ChunkComposer;
//!
//! # async fn example(mut socket: tokio::net::TcpStream) -> livehub::error::Result<()> {
//! let store = Arc::new(GroupStore::new(GroupConfig::default(), None, None));
//!
//! // a publisher connection, after its handshake completed
//! let group = store.get_or_create(&StreamKey::new("live", "room1"));
//! let (session, _write_rx) = MediaSession::new(SessionRole::Pub);
//! assert!(group.add_pub_session(Arc::clone(&session)));
//!
//! let mut composer = ChunkComposer::new();
//! let result = composer
//!     .run_loop(&mut socket, |header, payload| {
//!         group.on_read(header, payload);
//!         Ok(())
//!     })
//!     .await;
//!
//! group.del_pub_session();
//! session.dispose();
//! result
//! # }
//! ```

pub mod error;
pub mod hub;
pub mod media;
pub mod protocol;
pub mod sdp;
pub mod unique;

pub use error::{Error, Result};
pub use hub::{Group, GroupConfig, GroupStore, MediaSession, StreamKey};
pub use media::GopCache;
pub use protocol::{ChunkComposer, MessageHeader};
