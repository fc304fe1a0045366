//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes or strings were wrong, never the
//! network. Frame-level protocol errors are logged and dropped by the RPC
//! layer; the connection stays up.

/// Errors that can occur while encoding, decoding, or parsing wire values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into a frame).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields, or
    /// wrong value types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but is not a valid JSON-RPC 2.0 message.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A square name that is not `a1`..`h8`.
    #[error("invalid square: {0:?}")]
    InvalidSquare(String),

    /// A move code that is not `<from><to>[qrnb]`.
    #[error("invalid move code: {0:?}")]
    InvalidMove(String),

    /// A FEN string whose piece placement could not be read.
    #[error("invalid FEN: {0}")]
    InvalidFen(String),
}
