//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce visibility, ownership and version rules above storage.
//! - Keep the router and client decoupled from storage details.
//!
//! # Invariants
//! - Invisible and soft-deleted items surface as `NotFound`, never as
//!   `Forbidden`, so callers cannot probe for ids they cannot see.
//! - Storage failures are reported as `Repo` and never leak into public
//!   error details.

pub mod auth_service;
pub mod credentials;
pub mod note_service;
pub mod resource_service;
pub mod todo_service;

use crate::api::error::ErrorKind;
use crate::model::resource::{ResourceId, ValidationError};
use crate::repo::resource_repo::RepoError;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for use-case operations.
#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationError),
    NotFound {
        kind: &'static str,
        id: String,
    },
    /// Version mismatch or state clash. Carries the public detail.
    Conflict(String),
    /// Missing or invalid credential.
    Auth(&'static str),
    /// Authenticated but not permitted.
    Forbidden(&'static str),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl ServiceError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Repo(_) => ErrorKind::Transport,
        }
    }

    /// HTTP status for the router.
    pub fn status(&self) -> u16 {
        self.kind().status()
    }

    /// Client-facing `detail` text.
    pub fn public_detail(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::NotFound { .. } => "Not found".to_string(),
            Self::Conflict(message) => message.clone(),
            Self::Auth(message) | Self::Forbidden(message) => (*message).to_string(),
            Self::Repo(_) => "internal error".to_string(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Auth(message) => write!(f, "authentication failed: {message}"),
            Self::Forbidden(message) => write!(f, "forbidden: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            RepoError::VersionConflict { .. } => Self::Conflict("Version conflict".to_string()),
            RepoError::AlreadyExists { kind, .. } => {
                Self::Conflict(format!("{kind} already exists"))
            }
            other => Self::Repo(other),
        }
    }
}

/// Effective listing page size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimits {
    pub default: u32,
    pub max: u32,
}

impl Default for ListLimits {
    fn default() -> Self {
        Self {
            default: 200,
            max: 500,
        }
    }
}

impl ListLimits {
    /// `None` and `0` select the default; larger values clamp to `max`.
    pub fn resolve(&self, requested: Option<u32>) -> u32 {
        match requested {
            None | Some(0) => self.default,
            Some(value) => value.min(self.max),
        }
    }
}

/// Result of an item soft delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// `false` when the item was already deleted.
    pub deleted: bool,
}

/// Result of a container delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerDeleteOutcome {
    pub id: ResourceId,
    /// Default container that received the members.
    pub moved_to: ResourceId,
    #[serde(skip)]
    pub moved: usize,
}

#[cfg(test)]
mod tests {
    use super::{ListLimits, ServiceError};
    use crate::api::error::ErrorKind;
    use crate::repo::resource_repo::RepoError;

    #[test]
    fn limits_default_and_clamp() {
        let limits = ListLimits::default();
        assert_eq!(limits.resolve(None), 200);
        assert_eq!(limits.resolve(Some(0)), 200);
        assert_eq!(limits.resolve(Some(20)), 20);
        assert_eq!(limits.resolve(Some(10_000)), 500);
    }

    #[test]
    fn storage_failures_hide_details() {
        let err = ServiceError::from(RepoError::InvalidData("todos.done = 7".to_string()));
        assert_eq!(err.status(), 500);
        assert_eq!(err.public_detail(), "internal error");
    }

    #[test]
    fn version_conflict_maps_to_conflict_kind() {
        let err = ServiceError::from(RepoError::VersionConflict {
            kind: "todo",
            id: "t1".to_string(),
            expected: 1,
            actual: 2,
        });
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.public_detail(), "Version conflict");
    }
}
