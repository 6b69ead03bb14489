//! Wire error taxonomy shared by the authority and the client.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Classified failure of one API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input. Never retried.
    Validation,
    /// Unknown, deleted or invisible resource. Never retried.
    NotFound,
    /// Stale version or state clash. Re-fetch, then retry.
    Conflict,
    /// Missing or invalid credential. Re-authenticate.
    Auth,
    /// Authenticated but not permitted.
    Forbidden,
    /// Network, server or decoding failure. Safe to retry with backoff.
    Transport,
}

impl ErrorKind {
    /// Canonical HTTP status for this kind.
    pub fn status(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Auth => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Transport => 500,
        }
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::Validation,
            401 => Self::Auth,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            _ => Self::Transport,
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Conflict | Self::Transport)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Auth => "auth",
            Self::Forbidden => "forbidden",
            Self::Transport => "transport",
        };
        f.write_str(name)
    }
}

/// Error response body: `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Canonical reason phrase for an HTTP status.
pub fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown Status",
    }
}
