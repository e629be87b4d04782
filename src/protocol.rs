//! Transport-agnostic message envelope.
//!
//! Inbound messages are JSON objects tagged by `kind`:
//!
//! ```json
//! { "kind": "query", "text": "how do I close a channel" }
//! { "kind": "feedback", "query": "...", "response": "...", "rating": 4 }
//! ```
//!
//! Outbound messages use the same tagging:
//!
//! ```json
//! { "kind": "response", "text": "..." }
//! { "kind": "error", "code": "malformed", "message": "missing field `text`" }
//! ```
//!
//! Decoding never panics; anything that does not fit the envelope becomes a
//! [`ProtocolError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Feedback;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Inbound {
    Query {
        #[serde(alias = "query")]
        text: String,
    },
    Feedback {
        query: String,
        response: String,
        rating: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outbound {
    Response { text: String },
    Error { code: String, message: String },
}

impl Outbound {
    pub fn response(text: impl Into<String>) -> Self {
        Outbound::Response { text: text.into() }
    }

    pub fn to_json(&self) -> String {
        // Serializing a plain enum of strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Machine-readable reason a message was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolErrorCode {
    /// Not JSON, or fields missing / of the wrong type.
    Malformed,
    /// Valid JSON object with an unrecognized `kind`.
    UnknownKind,
}

impl ProtocolErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolErrorCode::Malformed => "malformed",
            ProtocolErrorCode::UnknownKind => "unknown_kind",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", .code.as_str())]
pub struct ProtocolError {
    pub code: ProtocolErrorCode,
    pub message: String,
}

impl ProtocolError {
    fn malformed(message: impl Into<String>) -> Self {
        Self {
            code: ProtocolErrorCode::Malformed,
            message: message.into(),
        }
    }

    pub fn to_outbound(&self) -> Outbound {
        Outbound::Error {
            code: self.code.as_str().to_string(),
            message: self.message.clone(),
        }
    }
}

/// Decode one raw inbound message.
pub fn decode(raw: &str) -> Result<Inbound, ProtocolError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ProtocolError::malformed(e.to_string()))?;

    let kind = value
        .get("kind")
        .ok_or_else(|| ProtocolError::malformed("missing field `kind`"))?
        .as_str()
        .ok_or_else(|| ProtocolError::malformed("field `kind` must be a string"))?;

    if kind != "query" && kind != "feedback" {
        return Err(ProtocolError {
            code: ProtocolErrorCode::UnknownKind,
            message: format!("unknown message kind: {}", kind),
        });
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::malformed(e.to_string()))
}

impl Inbound {
    /// The feedback carried by this message, if it is one.
    pub fn into_feedback(self) -> Option<Feedback> {
        match self {
            Inbound::Feedback {
                query,
                response,
                rating,
            } => Some(Feedback {
                query,
                response,
                rating,
            }),
            Inbound::Query { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_query() {
        let msg = decode(r#"{"kind":"query","text":"what is a slice"}"#).unwrap();
        assert_eq!(
            msg,
            Inbound::Query {
                text: "what is a slice".into()
            }
        );
    }

    #[test]
    fn test_decode_query_alias() {
        let msg = decode(r#"{"kind":"query","query":"hi"}"#).unwrap();
        assert_eq!(msg, Inbound::Query { text: "hi".into() });
    }

    #[test]
    fn test_decode_feedback() {
        let msg =
            decode(r#"{"kind":"feedback","query":"q","response":"r","rating":5}"#).unwrap();
        assert_eq!(msg.into_feedback().unwrap().rating, 5);
    }

    #[test]
    fn test_not_json() {
        let err = decode("hello").unwrap_err();
        assert_eq!(err.code, ProtocolErrorCode::Malformed);
    }

    #[test]
    fn test_missing_kind() {
        let err = decode(r#"{"text":"hi"}"#).unwrap_err();
        assert_eq!(err.code, ProtocolErrorCode::Malformed);
        assert!(err.message.contains("kind"));
    }

    #[test]
    fn test_unknown_kind() {
        let err = decode(r#"{"kind":"ping"}"#).unwrap_err();
        assert_eq!(err.code, ProtocolErrorCode::UnknownKind);
    }

    #[test]
    fn test_mistyped_fields() {
        let err = decode(r#"{"kind":"query","text":42}"#).unwrap_err();
        assert_eq!(err.code, ProtocolErrorCode::Malformed);

        let err =
            decode(r#"{"kind":"feedback","query":"q","response":"r","rating":4.5}"#).unwrap_err();
        assert_eq!(err.code, ProtocolErrorCode::Malformed);

        let err = decode(r#"{"kind":"feedback","query":"q","rating":1}"#).unwrap_err();
        assert!(err.message.contains("response"));
    }

    #[test]
    fn test_outbound_shape() {
        let json = Outbound::response("hello").to_json();
        assert_eq!(json, r#"{"kind":"response","text":"hello"}"#);

        let err = decode("[]").unwrap_err().to_outbound().to_json();
        assert!(err.starts_with(r#"{"kind":"error","code":"malformed""#));
    }
}
