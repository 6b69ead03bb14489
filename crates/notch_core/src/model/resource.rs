//! Versioned shareable resource model.
//!
//! # Responsibility
//! - Define the metadata header carried by todos, notes, lists and groups.
//! - Provide the lifecycle helpers used by every resource type.
//!
//! # Invariants
//! - `id`, `created_by` and `created_at` never change after creation.
//! - `touch` bumps `version` by exactly 1 and moves `updated_at` strictly
//!   forward, even when two mutations land in the same millisecond.
//! - `shared_with` never contains the owner and holds no duplicates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Opaque resource identifier (UUID v4 text for resources created here).
pub type ResourceId = String;
/// Opaque user identifier.
pub type UserId = String;
/// Unix epoch milliseconds.
pub type Timestamp = i64;

/// Returns the current wall clock as epoch milliseconds.
pub fn now_ms() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as Timestamp)
        .unwrap_or(0)
}

/// Next `updated_at` value after `previous`, given wall clock `now`.
pub fn next_stamp(previous: Timestamp, now: Timestamp) -> Timestamp {
    now.max(previous + 1)
}

/// Validation failures for resource payloads and patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty after trimming.
    MissingField(&'static str),
    /// A timestamp field holds a negative value.
    NegativeTimestamp(&'static str),
    /// `assigned_to` is neither the owner nor a shared user.
    AssigneeNotShared(UserId),
    /// Patch carries no mutable field.
    EmptyPatch,
    /// Share-link expiry must be a positive number of seconds.
    InvalidExpiry(i64),
    /// Request payload or query could not be decoded.
    Malformed(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "Missing {field}"),
            Self::NegativeTimestamp(field) => {
                write!(f, "{field} must be a non-negative epoch timestamp")
            }
            Self::AssigneeNotShared(user_id) => write!(
                f,
                "assigned_to `{user_id}` must be the owner or a shared user"
            ),
            Self::EmptyPatch => write!(f, "No fields to update"),
            Self::InvalidExpiry(value) => {
                write!(f, "expires_in_seconds must be positive, got {value}")
            }
            Self::Malformed(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ValidationError {}

/// Metadata header shared by every resource.
///
/// Serialized flattened into the owning record, so the wire shape keeps the
/// common fields at top level next to the type-specific ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMeta {
    pub id: ResourceId,
    pub created_by: UserId,
    pub shared_with: Vec<UserId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub version: i64,
}

impl ResourceMeta {
    /// Creates metadata for a brand new resource owned by `created_by`.
    pub fn new(created_by: impl Into<UserId>, shared_with: Vec<UserId>, now: Timestamp) -> Self {
        let created_by = created_by.into();
        let shared_with = normalize_shared_with(shared_with, &created_by);
        Self {
            id: Uuid::new_v4().to_string(),
            created_by,
            shared_with,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }

    /// Owner or shared member.
    pub fn can_access(&self, user_id: &str) -> bool {
        self.is_owner(user_id) || self.shared_with.iter().any(|member| member == user_id)
    }

    /// Records one accepted mutation.
    pub fn touch(&mut self, now: Timestamp) {
        self.version += 1;
        self.updated_at = next_stamp(self.updated_at, now);
    }

    /// Replaces the share set, keeping it normalized against the owner.
    pub fn set_shared_with(&mut self, users: Vec<UserId>) {
        self.shared_with = normalize_shared_with(users, &self.created_by);
    }
}

/// Trims, deduplicates and sorts user ids, dropping blanks and the owner.
pub fn normalize_shared_with(users: Vec<UserId>, owner: &str) -> Vec<UserId> {
    let unique: BTreeSet<UserId> = users
        .into_iter()
        .map(|user| user.trim().to_string())
        .filter(|user| !user.is_empty() && user != owner)
        .collect();
    unique.into_iter().collect()
}

/// Shared behavior of every versioned resource.
pub trait Versioned {
    fn meta(&self) -> &ResourceMeta;
    fn meta_mut(&mut self) -> &mut ResourceMeta;

    /// Checks record-level invariants before persistence.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Whether the record is visible to default fetches and patches.
    fn is_active(&self) -> bool {
        true
    }
}

/// Items that support soft deletion and restore.
pub trait SoftDelete: Versioned {
    fn deleted_at(&self) -> Option<Timestamp>;
    fn set_deleted_at(&mut self, at: Option<Timestamp>);

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

/// Closed partial update for resource type `T`.
///
/// Fields left out of the patch must leave the target untouched.
pub trait Patch<T> {
    /// Version the caller last observed, when it asks for a check.
    fn if_version(&self) -> Option<i64>;
    fn is_empty(&self) -> bool;
    /// Whether applying the patch rewrites `shared_with`.
    fn changes_sharing(&self) -> bool;
    fn apply(self, target: &mut T);
}

pub(crate) fn require_text(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

pub(crate) fn require_non_negative(
    value: Option<Timestamp>,
    field: &'static str,
) -> Result<(), ValidationError> {
    match value {
        Some(stamp) if stamp < 0 => Err(ValidationError::NegativeTimestamp(field)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{next_stamp, normalize_shared_with, ResourceMeta};

    #[test]
    fn new_meta_starts_at_version_one() {
        let meta = ResourceMeta::new("owner", vec![], 1_000);
        assert_eq!(meta.version, 1);
        assert_eq!(meta.created_at, 1_000);
        assert_eq!(meta.updated_at, 1_000);
        assert!(meta.shared_with.is_empty());
    }

    #[test]
    fn touch_advances_within_same_millisecond() {
        let mut meta = ResourceMeta::new("owner", vec![], 1_000);
        meta.touch(1_000);
        meta.touch(1_000);
        assert_eq!(meta.version, 3);
        assert_eq!(meta.updated_at, 1_002);
        assert_eq!(meta.created_at, 1_000);
    }

    #[test]
    fn next_stamp_follows_wall_clock_when_ahead() {
        assert_eq!(next_stamp(10, 500), 500);
        assert_eq!(next_stamp(500, 10), 501);
    }

    #[test]
    fn shared_with_is_normalized_against_owner() {
        let normalized = normalize_shared_with(
            vec![
                " bob ".to_string(),
                "owner".to_string(),
                "alice".to_string(),
                "bob".to_string(),
                "".to_string(),
            ],
            "owner",
        );
        assert_eq!(normalized, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn access_covers_owner_and_members_only() {
        let meta = ResourceMeta::new("owner", vec!["bob".to_string()], 1);
        assert!(meta.can_access("owner"));
        assert!(meta.can_access("bob"));
        assert!(!meta.can_access("mallory"));
        assert!(!meta.is_owner("bob"));
    }
}
