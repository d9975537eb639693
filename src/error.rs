//! Crate error types
//!
//! A single crate-level `Error` plus focused sub-enums for the areas that
//! can fail independently (chunk protocol, SDP parsing). Fatal session
//! errors surface to the session owner; the hub never aborts the process.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chunk protocol violation
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// SDP parse failure
    #[error(transparent)]
    Sdp(#[from] SdpError),
}

/// Structural violations of the chunk-message protocol
///
/// These are session-fatal: the composer is not retryable after
/// returning one of them.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Accumulated payload exceeded the length declared in the header
    #[error("message payload overrun: accumulated {accumulated} bytes, header declares {declared}")]
    LengthOverrun { accumulated: u32, declared: u32 },

    /// A protocol control message body was too short to decode
    #[error("control message type {type_id} too short: {len} bytes")]
    ControlTooShort { type_id: u8, len: usize },
}

/// SDP parse errors, referencing the offending input
#[derive(Debug, Error)]
pub enum SdpError {
    /// A line did not match the expected `k=v` shape
    #[error("malformed SDP line: {0:?}")]
    MalformedLine(String),

    /// An attribute was structurally invalid
    #[error("malformed SDP attribute: {0:?}")]
    MalformedAttribute(String),

    /// A required key was absent
    #[error("missing SDP key: {0}")]
    MissingKey(&'static str),

    /// A numeric field failed to parse
    #[error("invalid number in SDP: {0:?}")]
    InvalidNumber(String),

    /// Base64 payload (sprop-parameter-sets) failed to decode
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
}
