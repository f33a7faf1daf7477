//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The server never touches a concrete wire format directly: the connection
//! handler encodes outbound [`Envelope`](crate::Envelope)s and decodes
//! inbound [`ClientMessage`](crate::ClientMessage)s through a [`Codec`].
//! Browsers speak JSON, so [`JsonCodec`] is the one shipped by default.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Converts values to bytes and back.
///
/// `Send + Sync + 'static` because a single codec instance is shared by
/// every connection task the server spawns.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type, e.g. an unknown `type` tag.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use retroboard_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg: ClientMessage = codec.decode(br#"{"type":"move_player","steps":4}"#).unwrap();
/// assert_eq!(msg, ClientMessage::MovePlayer { steps: 4 });
///
/// let bytes = codec.encode(&msg).unwrap();
/// let again: ClientMessage = codec.decode(&bytes).unwrap();
/// assert_eq!(msg, again);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientMessage, Envelope, ServerMessage};

    #[test]
    fn test_json_codec_encodes_envelope_as_text() {
        let envelope = Envelope {
            seq: 3,
            timestamp: 1_500,
            message: ServerMessage::ServerHello { ok: true },
        };
        let bytes = JsonCodec.encode(&envelope).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(r#""type":"server_hello""#));
        assert!(text.contains(r#""seq":3"#));
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let err = JsonCodec.decode::<ClientMessage>(b"not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_json_codec_decode_unknown_type_is_decode_error() {
        let err = JsonCodec
            .decode::<ClientMessage>(br#"{"type":"fly_away"}"#)
            .unwrap_err();
        assert!(err.to_string().starts_with("decode failed"));
    }
}
