//! The `{"type": "<Tag>", ..fields}` JSON shape shared by segments and events.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
pub use serde_json::Value;
use serde_json::Map;

use crate::error::{DecodeError, DecodeResult};
use crate::variant::VariantWrapper;

/// Tagged JSON codec for a [`VariantWrapper`], generated by
/// `#[derive(VariantWrapper)]` with `#[variant(wire)]`.
pub trait TaggedWire: VariantWrapper {
    /// Encodes the live payload with its `type` tag.
    fn encode(&self) -> Value;

    /// Decodes `value` as the payload of `kind`; the tag itself is not
    /// re-checked.
    fn decode_kind(kind: Self::Kind, value: &Value) -> DecodeResult<Self>;
}

/// Reads the `type` tag of a wire object.
pub fn type_tag(value: &Value) -> DecodeResult<&str> {
    value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::MissingField("type".to_string()))
}

/// Serializes `payload` and inserts the `type` tag.
pub fn tagged<T: Serialize + ?Sized>(tag: &str, payload: &T) -> Value {
    // Payloads are plain structs, which always serialize to objects.
    let mut object = match serde_json::to_value(payload) {
        Ok(Value::Object(object)) => object,
        _ => Map::new(),
    };
    object.insert("type".to_string(), Value::String(tag.to_string()));
    Value::Object(object)
}

/// Deserializes a payload from a tagged object; the tag is ignored.
pub fn untag<T: DeserializeOwned>(value: &Value) -> DecodeResult<T> {
    T::deserialize(value).map_err(DecodeError::from)
}

/// Reads a JSON array, failing with [`DecodeError::Json`] otherwise.
pub fn array(value: &Value) -> DecodeResult<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| DecodeError::Json(format!("expected an array, found {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Ping {
        seq: i32,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Empty {}

    #[test]
    fn test_tagged() {
        assert_eq!(
            tagged("Ping", &Ping { seq: 3 }),
            json!({ "type": "Ping", "seq": 3 })
        );
        assert_eq!(tagged("Empty", &Empty {}), json!({ "type": "Empty" }));
    }

    #[test]
    fn test_untag_ignores_tag() {
        let ping: Ping = untag(&json!({ "type": "Ping", "seq": 7 })).unwrap();
        assert_eq!(ping, Ping { seq: 7 });
        let empty: Empty = untag(&json!({ "type": "Empty" })).unwrap();
        assert_eq!(empty, Empty {});
    }

    #[test]
    fn test_type_tag() {
        assert_eq!(type_tag(&json!({ "type": "Ping" })).unwrap(), "Ping");
        assert_eq!(
            type_tag(&json!({ "seq": 1 })),
            Err(DecodeError::MissingField("type".to_string()))
        );
        assert!(type_tag(&json!({ "type": 5 })).is_err());
    }
}
