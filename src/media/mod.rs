//! Media handling
//!
//! This module provides:
//! - FLV classification of audio/video message payloads and FLV tag
//!   serialization for the HTTP-FLV egress
//! - GOP caching for late-joiner support

pub mod flv;
pub mod gop;

pub use flv::{AudioFormat, VideoCodec, VideoFrameType};
pub use gop::GopCache;
