use serde::{Deserialize, Serialize};

/// Fallback used when a failed response carries no usable message.
pub const GENERIC_FAILURE: &str = "Request failed";

/// Error body returned by the backend.
///
/// Route handlers report `{"error": ...}`, while the token layer reports
/// `{"msg": ...}`; either may be missing.
#[derive(Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Message set by route handlers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Message set by the JWT layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl ErrorResponse {
    /// Creates an error response carrying an `error` message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            msg: None,
        }
    }

    /// Parses a raw response body, tolerating empty or non-JSON payloads.
    #[must_use]
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// The message to show the user: `error`, then `msg`, then the generic fallback.
    #[must_use]
    pub fn message(&self) -> &str {
        self.error
            .as_deref()
            .filter(|value| !value.is_empty())
            .or_else(|| self.msg.as_deref().filter(|value| !value.is_empty()))
            .unwrap_or(GENERIC_FAILURE)
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ErrorResponse {}

/// Plain acknowledgement body, e.g. after a delete.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}
