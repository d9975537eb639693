//! Stream fan-out hub
//!
//! One [`Group`] per published stream routes media from a single source
//! to every attached sink. The broadcast path renders each egress form
//! lazily and at most once per message:
//!
//! ```text
//!                         Arc<Group>
//!               ┌───────────────────────────┐
//!               │ pub / pull  (the source)  │
//!               │ sub_sessions              │
//!               │ httpflv_sub_sessions      │
//!               │ url2push_proxy            │
//!               │ hls_muxer                 │
//!               │ gop caches (rtmp, flv)    │
//!               └────────────┬──────────────┘
//!                            │ on_read(msg)
//!          ┌─────────────┬───┴───────┬──────────────┐
//!          ▼             ▼           ▼              ▼
//!     [RTMP subs]   [push sinks] [FLV subs]    [HLS muxer]
//!     chunked bytes chunked      FLV tags      raw message
//! ```
//!
//! Fresh sinks receive the GOP-cache replay prefix before their first
//! live message. Relay activation (pull on demand, push on publish) is
//! retried on external `tick()` calls; the hub itself runs no timers.

pub mod config;
pub mod group;
pub mod hls;
pub mod lazy;
pub mod relay;
pub mod session;
pub mod store;

pub use config::GroupConfig;
pub use group::{Group, GroupStats};
pub use hls::{HlsMuxer, HlsMuxerFactory};
pub use lazy::{LazyChunkDivider, LazyFlvTag};
pub use relay::{MessageObserver, PushTimeouts, RelayDialer};
pub use session::{MediaSession, SessionRole};
pub use store::{GroupStore, StreamKey};
