//! Client-side error classification.
//!
//! # Invariants
//! - Non-success responses keep their HTTP status and map to an
//!   `ErrorKind` through the shared status table.
//! - `detail` falls back from the `{detail}` body to the raw body text,
//!   then to the canonical status description.
//! - Network failures and unparseable success bodies are `Transport`.

use notch_core::api::{status_text, ErrorBody, ErrorKind};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ClientResult<T> = Result<T, ClientError>;

/// Failure of one client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    pub kind: ErrorKind,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    pub detail: String,
}

impl ClientError {
    /// Classifies a non-success response.
    pub fn from_response(status: u16, body: &str) -> Self {
        Self {
            kind: ErrorKind::from_status(status),
            status: Some(status),
            detail: response_detail(status, body),
        }
    }

    /// Network or I/O failure before a response arrived.
    pub fn transport(detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transport,
            status: None,
            detail: detail.into(),
        }
    }

    /// Success status with a body that does not decode.
    pub fn undecodable(status: u16, err: &serde_json::Error) -> Self {
        Self {
            kind: ErrorKind::Transport,
            status: Some(status),
            detail: format!("Invalid response body: {err}"),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} error ({status}): {}", self.kind, self.detail),
            None => write!(f, "{} error: {}", self.kind, self.detail),
        }
    }
}

impl Error for ClientError {}

fn response_detail(status: u16, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if !parsed.detail.trim().is_empty() {
            return parsed.detail;
        }
    }
    let raw = body.trim();
    if !raw.is_empty() {
        return raw.to_string();
    }
    status_text(status).to_string()
}

#[cfg(test)]
mod tests {
    use super::ClientError;
    use notch_core::api::ErrorKind;

    #[test]
    fn detail_prefers_json_body() {
        let err = ClientError::from_response(409, r#"{"detail":"Version conflict"}"#);
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(err.status, Some(409));
        assert_eq!(err.detail, "Version conflict");
        assert!(err.is_retryable());
    }

    #[test]
    fn detail_falls_back_to_raw_text_then_status() {
        let raw = ClientError::from_response(502, "upstream down");
        assert_eq!(raw.kind, ErrorKind::Transport);
        assert_eq!(raw.detail, "upstream down");

        let bare = ClientError::from_response(404, "  ");
        assert_eq!(bare.kind, ErrorKind::NotFound);
        assert_eq!(bare.detail, "Not Found");
        assert!(!bare.is_retryable());
    }

    #[test]
    fn undecodable_success_is_transport() {
        let parse_err = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let err = ClientError::undecodable(200, &parse_err);
        assert_eq!(err.kind, ErrorKind::Transport);
        assert_eq!(err.status, Some(200));
    }
}
