//! Typed errors for the Lever API client.
//!
//! Every failure a request can hit is collapsed into one of five kinds so
//! callers can tell transport problems, upstream rejections, and protocol
//! violations apart without inspecting reqwest internals. These errors
//! propagate unchanged from the client to the tool boundary; no intermediate
//! layer retries or reinterprets them.

use thiserror::Error;

/// Errors produced by [`crate::client::LeverClient`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// The per-request timeout elapsed before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// Connection or transport failure other than a timeout.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The upstream answered with something that is not JSON.
    #[error("unexpected response type: {content_type}. Response: {body_prefix}")]
    UnexpectedContentType {
        content_type: String,
        /// First portion of the raw body, kept for diagnostics.
        body_prefix: String,
    },

    /// The upstream rejected the request (HTTP status >= 400).
    ///
    /// `message` is the upstream's own `message` field when the body was a
    /// structured JSON object, otherwise the status and raw body. A 429
    /// rate-limit rejection lands here too; the client never retries it.
    #[error("Lever API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// The response claimed to be JSON but did not parse.
    #[error("invalid JSON response from Lever API: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a reqwest transport failure, keeping timeouts distinct.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err)
        }
    }

    /// Build a status error from the decoded body, preferring the
    /// upstream-provided `message` field.
    pub fn from_status(status: u16, body: &serde_json::Value) -> Self {
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("API error: {} - {}", status, body));
        ApiError::Status { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_prefers_upstream_message() {
        let body = serde_json::json!({ "message": "invalid stage id" });
        let err = ApiError::from_status(400, &body);
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid stage id");
            }
            other => panic!("wrong kind: {:?}", other),
        }
    }

    #[test]
    fn test_status_falls_back_to_raw_body() {
        let body = serde_json::json!(["unexpected"]);
        let err = ApiError::from_status(500, &body);
        let text = err.to_string();
        assert!(text.contains("500"));
        assert!(text.contains("unexpected"));
    }
}
