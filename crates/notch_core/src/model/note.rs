//! Note and note-group records.
//!
//! # Responsibility
//! - Define the `Note` item and its `NoteGroup` container.
//! - Define create payloads and closed patches for both.
//!
//! # Invariants
//! - `body_md` is unbounded free text and may be empty.
//! - Share-link editors may only touch `title` and `body_md`.

use crate::model::resource::{
    require_text, Patch, ResourceId, ResourceMeta, SoftDelete, Timestamp, UserId,
    ValidationError, Versioned,
};
use serde::{Deserialize, Serialize};

/// Name of the per-user default note group.
pub const DEFAULT_GROUP_NAME: &str = "General";

/// Markdown note, optionally scoped to a `NoteGroup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub group_id: Option<ResourceId>,
    pub title: String,
    pub body_md: String,
    /// Soft-delete marker.
    #[serde(default)]
    pub deleted_at: Option<Timestamp>,
}

impl Note {
    /// Builds a new note owned by `owner` from a create payload.
    pub fn create(
        payload: NewNote,
        owner: impl Into<UserId>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let note = Self {
            meta: ResourceMeta::new(owner, payload.shared_with, now),
            group_id: payload
                .group_id
                .map(|group_id| group_id.trim().to_string())
                .filter(|group_id| !group_id.is_empty()),
            title: payload.title.trim().to_string(),
            body_md: payload.body_md,
            deleted_at: None,
        };
        note.validate()?;
        Ok(note)
    }
}

impl Versioned for Note {
    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ResourceMeta {
        &mut self.meta
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.title, "title")
    }

    fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

impl SoftDelete for Note {
    fn deleted_at(&self) -> Option<Timestamp> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, at: Option<Timestamp>) {
        self.deleted_at = at;
    }
}

/// Create payload for `Note`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewNote {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body_md: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_with: Vec<UserId>,
}

impl NewNote {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn body(mut self, body_md: impl Into<String>) -> Self {
        self.body_md = body_md.into();
        self
    }

    pub fn in_group(mut self, group_id: impl Into<ResourceId>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn shared_with(mut self, users: Vec<UserId>) -> Self {
        self.shared_with = users;
        self
    }
}

/// Closed partial update for `Note`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_md: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::model::patch::nullable"
    )]
    pub group_id: Option<Option<ResourceId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_with: Option<Vec<UserId>>,
}

impl NotePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the stored version to equal `version`.
    pub fn expect_version(mut self, version: i64) -> Self {
        self.if_version = Some(version);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn body(mut self, body_md: impl Into<String>) -> Self {
        self.body_md = Some(body_md.into());
        self
    }

    pub fn group_id(mut self, group_id: Option<ResourceId>) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn shared_with(mut self, users: Vec<UserId>) -> Self {
        self.shared_with = Some(users);
        self
    }

    /// Target group when the patch moves the note into a group.
    pub fn target_group(&self) -> Option<&str> {
        match &self.group_id {
            Some(Some(group_id)) if !group_id.trim().is_empty() => Some(group_id.as_str()),
            _ => None,
        }
    }

    /// Whether the patch only edits content (title/body).
    pub fn is_content_only(&self) -> bool {
        self.group_id.is_none() && self.shared_with.is_none()
    }
}

impl Patch<Note> for NotePatch {
    fn if_version(&self) -> Option<i64> {
        self.if_version
    }

    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body_md.is_none()
            && self.group_id.is_none()
            && self.shared_with.is_none()
    }

    fn changes_sharing(&self) -> bool {
        self.shared_with.is_some()
    }

    fn apply(self, note: &mut Note) {
        if let Some(title) = self.title {
            note.title = title.trim().to_string();
        }
        if let Some(body_md) = self.body_md {
            note.body_md = body_md;
        }
        if let Some(group_id) = self.group_id {
            note.group_id = group_id
                .map(|inner| inner.trim().to_string())
                .filter(|inner| !inner.is_empty());
        }
        if let Some(shared_with) = self.shared_with {
            note.meta.set_shared_with(shared_with);
        }
    }
}

/// Named container for notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteGroup {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub name: String,
    /// Set once at provisioning; renames never change it.
    #[serde(default)]
    pub is_default: bool,
}

impl NoteGroup {
    pub fn create(
        payload: NewNoteGroup,
        owner: impl Into<UserId>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let group = Self {
            meta: ResourceMeta::new(owner, payload.shared_with, now),
            name: payload.name.trim().to_string(),
            is_default: false,
        };
        group.validate()?;
        Ok(group)
    }

    /// The per-user fallback container, named `DEFAULT_GROUP_NAME`.
    pub fn default_for(owner: impl Into<UserId>, now: Timestamp) -> Result<Self, ValidationError> {
        let mut group = Self::create(NewNoteGroup::new(DEFAULT_GROUP_NAME), owner, now)?;
        group.is_default = true;
        Ok(group)
    }
}

impl Versioned for NoteGroup {
    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ResourceMeta {
        &mut self.meta
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "name")
    }
}

/// Create payload for `NoteGroup`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewNoteGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_with: Vec<UserId>,
}

impl NewNoteGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared_with: Vec::new(),
        }
    }
}

/// Closed partial update for `NoteGroup`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteGroupPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_with: Option<Vec<UserId>>,
}

impl NoteGroupPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_version(mut self, version: i64) -> Self {
        self.if_version = Some(version);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn shared_with(mut self, users: Vec<UserId>) -> Self {
        self.shared_with = Some(users);
        self
    }
}

impl Patch<NoteGroup> for NoteGroupPatch {
    fn if_version(&self) -> Option<i64> {
        self.if_version
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.shared_with.is_none()
    }

    fn changes_sharing(&self) -> bool {
        self.shared_with.is_some()
    }

    fn apply(self, group: &mut NoteGroup) {
        if let Some(name) = self.name {
            group.name = name.trim().to_string();
        }
        if let Some(shared_with) = self.shared_with {
            group.meta.set_shared_with(shared_with);
        }
    }
}
