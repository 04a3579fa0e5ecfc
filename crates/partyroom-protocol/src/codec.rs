//! Codec trait and the JSON implementation.
//!
//! The server never touches `serde_json` directly: the connection handler
//! decodes [`Request`](crate::Request)s and encodes
//! [`Outbound`](crate::Outbound) frames through whatever [`Codec`] it was
//! built with.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts values to and from text frames.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] when the text is malformed or does
    /// not match the expected shape.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that speaks JSON, the format browser clients send.
///
/// ```rust
/// use partyroom_protocol::{ClientEvent, Codec, JsonCodec, Request};
///
/// let codec = JsonCodec;
/// let req: Request = codec
///     .decode(r#"{"ack": 1, "event": {"type": "health"}}"#)
///     .unwrap();
/// assert_eq!(req.ack, Some(1));
/// assert_eq!(req.event, ClientEvent::Health);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, Reply, Response};

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<crate::Request, _> = JsonCodec.decode("not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_reply_produces_ack_and_response() {
        let reply = Reply {
            ack: 9,
            response: Response::Failure {
                error: "room not found".into(),
                code: ErrorKind::NotFound,
            },
        };
        let text = JsonCodec.encode(&reply).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["ack"], 9);
        assert_eq!(json["response"]["error"], "room not found");
        assert_eq!(json["response"]["code"], "not-found");
    }
}
