//! Chunk-message protocol framing
//!
//! The wire protocol multiplexes messages over chunk streams. The
//! `composer` reassembles inbound chunks into whole messages with
//! maintained absolute timestamps; the `divider` is the symmetric
//! encoder used for every outbound copy of a message.

pub mod composer;
pub mod constants;
pub mod divider;
pub mod message;

pub use composer::ChunkComposer;
pub use divider::message_to_chunks;
pub use message::{make_default_header, MessageHeader};
