//! Share-link capability for notes.
//!
//! A share link is a bearer token granting read or read-write access to one
//! note, independent of `shared_with` membership.

use crate::model::resource::{ResourceId, Timestamp, UserId, ValidationError};
use serde::{Deserialize, Serialize};

/// Stored share-link capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    pub token: String,
    pub note_id: ResourceId,
    pub can_edit: bool,
    pub created_by: UserId,
    pub created_at: Timestamp,
    /// `None` means the link never expires.
    pub expires_at: Option<Timestamp>,
}

impl ShareLink {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }
}

/// Share link as returned to the issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedShare {
    #[serde(flatten)]
    pub link: ShareLink,
    /// Fully formed access URL.
    pub url: String,
}

/// Request body for issuing a share link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShareRequest {
    /// Defaults to read-only.
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in_seconds: Option<i64>,
}

impl ShareRequest {
    pub fn read_only() -> Self {
        Self::default()
    }

    pub fn editable() -> Self {
        Self {
            can_edit: true,
            expires_in_seconds: None,
        }
    }

    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.expires_in_seconds = Some(seconds);
        self
    }

    /// Absolute expiry for a link issued at `now`.
    pub fn expires_at(&self, now: Timestamp) -> Result<Option<Timestamp>, ValidationError> {
        match self.expires_in_seconds {
            None => Ok(None),
            Some(seconds) if seconds <= 0 => Err(ValidationError::InvalidExpiry(seconds)),
            Some(seconds) => Ok(Some(now.saturating_add(seconds.saturating_mul(1_000)))),
        }
    }
}
