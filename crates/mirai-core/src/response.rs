//! The `{code, msg}` envelope carried by server responses.

use crate::error::RemoteError;
use crate::wire::Value;

/// Checks the status code of a response body.
///
/// Bodies without a `code` (lists, configs) and bodies with `code == 0` are
/// accepted.
pub fn check_response(body: &Value) -> Result<(), RemoteError> {
    match body.get("code").and_then(Value::as_i64) {
        None | Some(0) => Ok(()),
        Some(code) => Err(RemoteError {
            code,
            msg: body
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
    }
}
