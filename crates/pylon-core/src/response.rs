//! The uniform JSON response envelope.
//!
//! Every Pylon endpoint, success or failure, replies with the same envelope:
//!
//! ```json
//! {"returnCode": 0, "returnMessage": null, "returnData": {...}, "extraData": null}
//! ```
//!
//! Application-level error codes live inside the envelope; the HTTP transport
//! status is always 200 except for transport-level failures.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The uniform JSON response envelope.
///
/// # Example
///
/// ```
/// use pylon_core::BaseResponse;
/// use serde_json::json;
///
/// let response = BaseResponse::ok(json!({"user": "alice"}));
/// assert_eq!(response.return_code, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseResponse {
    /// Application-level result code. `0` means success.
    pub return_code: i64,
    /// Optional human-readable message.
    #[serde(default)]
    pub return_message: Option<String>,
    /// The payload of the response.
    #[serde(default)]
    pub return_data: Option<Value>,
    /// Additional payload carried alongside the data.
    #[serde(default)]
    pub extra_data: Option<Value>,
}

impl BaseResponse {
    /// Creates an envelope with all four fields.
    #[must_use]
    pub fn of(
        return_code: i64,
        return_message: Option<String>,
        return_data: Option<Value>,
        extra_data: Option<Value>,
    ) -> Self {
        Self {
            return_code,
            return_message,
            return_data,
            extra_data,
        }
    }

    /// Creates a success envelope (code `0`) carrying data.
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self::of(0, None, Some(data), None)
    }

    /// Creates a success envelope with a message and optional data.
    #[must_use]
    pub fn message(message: impl Into<String>, data: Option<Value>) -> Self {
        Self::of(0, Some(message.into()), data, None)
    }

    /// Creates an error envelope with a code and message.
    #[must_use]
    pub fn error(return_code: i64, message: impl Into<String>) -> Self {
        Self::of(return_code, Some(message.into()), None, None)
    }

    /// Serializes the envelope to its JSON wire form.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            // The envelope only holds Value payloads, so this is unreachable
            // in practice; keep the wire contract anyway.
            r#"{"returnCode":500,"returnMessage":"serialization failure","returnData":null,"extraData":null}"#.to_string()
        })
    }
}

impl Default for BaseResponse {
    fn default() -> Self {
        Self::of(0, None, None, None)
    }
}
