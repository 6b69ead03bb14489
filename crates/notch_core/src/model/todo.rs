//! Todo and todo-list records.
//!
//! # Responsibility
//! - Define the `Todo` item and its `TodoList` container.
//! - Define create payloads and closed patches for both.
//!
//! # Invariants
//! - `assigned_to`, when set, is the owner or a member of `shared_with`.
//! - `remind_sent_at` is never written by a client patch; moving
//!   `remind_at` clears it so the reminder can fire again.
//! - The canonical schema has no free-text `notes` field.

use crate::model::resource::{
    require_non_negative, require_text, Patch, ResourceId, ResourceMeta, SoftDelete, Timestamp,
    UserId, ValidationError, Versioned,
};
use serde::{Deserialize, Serialize};

/// Name of the per-user default todo list.
pub const DEFAULT_LIST_NAME: &str = "Inbox";

/// Actionable item, optionally scoped to a `TodoList`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub title: String,
    pub done: bool,
    pub due_at: Option<Timestamp>,
    pub remind_at: Option<Timestamp>,
    /// Written by the notification collaborator only.
    pub remind_sent_at: Option<Timestamp>,
    pub assigned_to: Option<UserId>,
    pub list_id: Option<ResourceId>,
    /// Soft-delete marker.
    #[serde(default)]
    pub deleted_at: Option<Timestamp>,
}

impl Todo {
    /// Builds a new todo owned by `owner` from a create payload.
    pub fn create(
        payload: NewTodo,
        owner: impl Into<UserId>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let todo = Self {
            meta: ResourceMeta::new(owner, payload.shared_with, now),
            title: payload.title.trim().to_string(),
            done: false,
            due_at: payload.due_at,
            remind_at: payload.remind_at,
            remind_sent_at: None,
            assigned_to: non_blank(payload.assigned_to),
            list_id: non_blank(payload.list_id),
            deleted_at: None,
        };
        todo.validate()?;
        Ok(todo)
    }
}

impl Versioned for Todo {
    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ResourceMeta {
        &mut self.meta
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.title, "title")?;
        require_non_negative(self.due_at, "due_at")?;
        require_non_negative(self.remind_at, "remind_at")?;
        if let Some(assignee) = self.assigned_to.as_deref() {
            if !self.meta.can_access(assignee) {
                return Err(ValidationError::AssigneeNotShared(assignee.to_string()));
            }
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

impl SoftDelete for Todo {
    fn deleted_at(&self) -> Option<Timestamp> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, at: Option<Timestamp>) {
        self.deleted_at = at;
    }
}

/// Create payload for `Todo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTodo {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remind_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_with: Vec<UserId>,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn in_list(mut self, list_id: impl Into<ResourceId>) -> Self {
        self.list_id = Some(list_id.into());
        self
    }

    pub fn shared_with(mut self, users: Vec<UserId>) -> Self {
        self.shared_with = users;
        self
    }

    pub fn assigned_to(mut self, user_id: impl Into<UserId>) -> Self {
        self.assigned_to = Some(user_id.into());
        self
    }

    pub fn remind_at(mut self, at: Timestamp) -> Self {
        self.remind_at = Some(at);
        self
    }
}

/// Closed partial update for `Todo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::model::patch::nullable"
    )]
    pub due_at: Option<Option<Timestamp>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::model::patch::nullable"
    )]
    pub remind_at: Option<Option<Timestamp>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::model::patch::nullable"
    )]
    pub assigned_to: Option<Option<UserId>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::model::patch::nullable"
    )]
    pub list_id: Option<Option<ResourceId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_with: Option<Vec<UserId>>,
}

impl TodoPatch {
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

    pub fn done(mut self, done: bool) -> Self {
        self.done = Some(done);
        self
    }

    pub fn due_at(mut self, at: Option<Timestamp>) -> Self {
        self.due_at = Some(at);
        self
    }

    pub fn remind_at(mut self, at: Option<Timestamp>) -> Self {
        self.remind_at = Some(at);
        self
    }

    pub fn assigned_to(mut self, user_id: Option<UserId>) -> Self {
        self.assigned_to = Some(user_id);
        self
    }

    pub fn list_id(mut self, list_id: Option<ResourceId>) -> Self {
        self.list_id = Some(list_id);
        self
    }

    pub fn shared_with(mut self, users: Vec<UserId>) -> Self {
        self.shared_with = Some(users);
        self
    }

    /// Target list when the patch moves the todo into a list.
    pub fn target_list(&self) -> Option<&str> {
        match &self.list_id {
            Some(Some(list_id)) if !list_id.trim().is_empty() => Some(list_id.as_str()),
            _ => None,
        }
    }
}

impl Patch<Todo> for TodoPatch {
    fn if_version(&self) -> Option<i64> {
        self.if_version
    }

    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.done.is_none()
            && self.due_at.is_none()
            && self.remind_at.is_none()
            && self.assigned_to.is_none()
            && self.list_id.is_none()
            && self.shared_with.is_none()
    }

    fn changes_sharing(&self) -> bool {
        self.shared_with.is_some()
    }

    fn apply(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title.trim().to_string();
        }
        if let Some(done) = self.done {
            todo.done = done;
        }
        if let Some(due_at) = self.due_at {
            todo.due_at = due_at;
        }
        if let Some(remind_at) = self.remind_at {
            if remind_at != todo.remind_at {
                todo.remind_sent_at = None;
            }
            todo.remind_at = remind_at;
        }
        if let Some(assigned_to) = self.assigned_to {
            todo.assigned_to = non_blank(assigned_to);
        }
        if let Some(list_id) = self.list_id {
            todo.list_id = non_blank(list_id);
        }
        if let Some(shared_with) = self.shared_with {
            todo.meta.set_shared_with(shared_with);
        }
    }
}

/// Named container for todos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub name: String,
    /// Set once at provisioning; renames never change it.
    #[serde(default)]
    pub is_default: bool,
}

impl TodoList {
    pub fn create(
        payload: NewTodoList,
        owner: impl Into<UserId>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let list = Self {
            meta: ResourceMeta::new(owner, payload.shared_with, now),
            name: payload.name.trim().to_string(),
            is_default: false,
        };
        list.validate()?;
        Ok(list)
    }

    /// The per-user fallback container, named `DEFAULT_LIST_NAME`.
    pub fn default_for(owner: impl Into<UserId>, now: Timestamp) -> Result<Self, ValidationError> {
        let mut list = Self::create(NewTodoList::new(DEFAULT_LIST_NAME), owner, now)?;
        list.is_default = true;
        Ok(list)
    }
}

impl Versioned for TodoList {
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

/// Create payload for `TodoList`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTodoList {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_with: Vec<UserId>,
}

impl NewTodoList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared_with: Vec::new(),
        }
    }
}

/// Closed partial update for `TodoList`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TodoListPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_with: Option<Vec<UserId>>,
}

impl TodoListPatch {
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

impl Patch<TodoList> for TodoListPatch {
    fn if_version(&self) -> Option<i64> {
        self.if_version
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.shared_with.is_none()
    }

    fn changes_sharing(&self) -> bool {
        self.shared_with.is_some()
    }

    fn apply(self, list: &mut TodoList) {
        if let Some(name) = self.name {
            list.name = name.trim().to_string();
        }
        if let Some(shared_with) = self.shared_with {
            list.meta.set_shared_with(shared_with);
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|inner| inner.trim().to_string())
        .filter(|inner| !inner.is_empty())
}
