//! Codec trait and implementations for frame text.
//!
//! A "codec" converts between Rust values and the text that travels in one
//! WebSocket frame. The RPC layer only talks to the [`Codec`] trait, so the
//! wire format can be swapped without touching call correlation.
//!
//! The room endpoint speaks JSON-RPC 2.0, so [`JsonCodec`] is the one in use.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust values to frame text and decode them back.
///
/// `Send + Sync + 'static` because the codec is stored inside the RPC client
/// and used from whichever Tokio worker runs the event pump.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into the text of one frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes the text of one frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the text is malformed or doesn't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use razchess_protocol::{Codec, JsonCodec, Request};
///
/// let codec = JsonCodec;
/// let request = Request::new(1, "Session.Move", serde_json::json!(["e2e4"]));
///
/// let text = codec.encode(&request).unwrap();
/// assert!(text.contains("\"Session.Move\""));
///
/// let decoded: Request = codec.decode(&text).unwrap();
/// assert_eq!(decoded, request);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::GameUpdate;

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let result: Result<serde_json::Value, _> = JsonCodec.decode("not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_wrong_shape_is_decode_error() {
        // Valid JSON, but an update needs at least a fen.
        let result: Result<GameUpdate, _> = JsonCodec.decode(r#"{"name": "hello"}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
