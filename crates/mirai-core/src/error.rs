//! Unified error types for the mirai core model.
//!
//! Session-level errors (which wrap these) are defined in mirai-runtime.

use thiserror::Error;

// =============================================================================
// Decode Errors
// =============================================================================

/// Schema violations found while decoding a wire payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The `type` tag names no known segment kind.
    #[error("unknown segment kind: {0}")]
    UnknownSegmentKind(String),

    /// The `type` tag names no known event kind.
    #[error("unknown event kind: {0}")]
    UnknownEventKind(String),

    /// A required key is absent.
    #[error("missing field: {0}")]
    MissingField(String),

    /// Malformed JSON or a field of the wrong type.
    #[error("invalid payload: {0}")]
    Json(String),
}

impl From<serde_json::Error> for DecodeError {
    /// Errors raised by the hand-written `Deserialize` impls of segments,
    /// received messages and events reach serde as text; their variant is
    /// read back from the message here.
    fn from(err: serde_json::Error) -> Self {
        let mut message = err.to_string();
        if err.line() != 0 {
            let position = format!(" at line {} column {}", err.line(), err.column());
            if message.ends_with(&position) {
                message.truncate(message.len() - position.len());
            }
        }
        Self::from_message(message)
    }
}

impl DecodeError {
    fn from_message(message: String) -> Self {
        if let Some(field) = message
            .strip_prefix("missing field `")
            .and_then(|rest| rest.split('`').next())
        {
            return Self::MissingField(field.to_string());
        }
        let prefixes: [(&str, fn(String) -> Self); 4] = [
            ("unknown segment kind: ", Self::UnknownSegmentKind),
            ("unknown event kind: ", Self::UnknownEventKind),
            ("missing field: ", Self::MissingField),
            ("invalid payload: ", Self::Json),
        ];
        for (prefix, variant) in prefixes {
            if let Some(rest) = message.strip_prefix(prefix) {
                return variant(rest.to_string());
            }
        }
        Self::Json(message)
    }
}

// =============================================================================
// Variant Access Errors
// =============================================================================

/// Typed access asked for a payload kind the wrapper does not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("type mismatch: expected {expected}, found {actual}")]
pub struct TypeMismatch {
    /// The requested kind.
    pub expected: &'static str,
    /// The live kind.
    pub actual: &'static str,
}

// =============================================================================
// Escape Errors
// =============================================================================

/// An escaped string contains a sequence that no escape rule produces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed escape sequence at byte {position}: {reason}")]
pub struct MalformedEscape {
    /// Byte offset of the offending character.
    pub position: usize,
    /// What was wrong.
    pub reason: &'static str,
}

// =============================================================================
// Remote Errors
// =============================================================================

/// The server answered with a non-zero `code`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote error ({code}): {msg}")]
pub struct RemoteError {
    /// The `code` field of the response envelope.
    pub code: i64,
    /// The `msg` field of the response envelope.
    pub msg: String,
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors raised by the HTTP transport collaborator.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status} error: {body}")]
    Http {
        /// Status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The request could not be sent or its response could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid transport configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct NeedsText {
        #[allow(dead_code)]
        text: String,
    }

    #[test]
    fn test_missing_field_is_classified() {
        let err = serde_json::from_value::<NeedsText>(serde_json::json!({})).unwrap_err();
        assert_eq!(
            DecodeError::from(err),
            DecodeError::MissingField("text".to_string())
        );
    }

    #[test]
    fn test_type_error_is_json() {
        let err =
            serde_json::from_value::<NeedsText>(serde_json::json!({ "text": 1 })).unwrap_err();
        assert!(matches!(DecodeError::from(err), DecodeError::Json(_)));
    }

    #[test]
    fn test_nested_decode_errors_keep_their_kind() {
        let err = serde_json::from_str::<crate::Segment>(r#"{"type":"Voice"}"#).unwrap_err();
        assert_eq!(
            DecodeError::from(err),
            DecodeError::UnknownSegmentKind("Voice".to_string())
        );

        let err = serde_json::from_value::<Vec<crate::Segment>>(serde_json::json!([
            { "type": "At", "display": "" }
        ]))
        .unwrap_err();
        assert_eq!(
            DecodeError::from(err),
            DecodeError::MissingField("target".to_string())
        );
    }
}
