//! JSON response envelopes.
//!
//! Every success body is an object with `ok: true` next to one named
//! payload. The same structs decode responses on the client side.

use crate::model::note::{Note, NoteGroup};
use crate::model::resource::ResourceId;
use crate::model::share::IssuedShare;
use crate::model::todo::{Todo, TodoList};
use crate::model::user::User;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthEnvelope {
    pub ok: bool,
    pub service: String,
}

/// Bare acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkEnvelope {
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapEnvelope {
    pub ok: bool,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEnvelope {
    pub ok: bool,
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub ok: bool,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersEnvelope {
    pub ok: bool,
    pub users: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEnvelope {
    pub ok: bool,
    pub list: TodoList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListsEnvelope {
    pub ok: bool,
    pub lists: Vec<TodoList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoEnvelope {
    pub ok: bool,
    pub todo: Todo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodosEnvelope {
    pub ok: bool,
    pub todos: Vec<Todo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEnvelope {
    pub ok: bool,
    pub group: NoteGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupsEnvelope {
    pub ok: bool,
    pub groups: Vec<NoteGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEnvelope {
    pub ok: bool,
    pub note: Note,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesEnvelope {
    pub ok: bool,
    pub notes: Vec<Note>,
}

/// Item soft-delete result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEnvelope {
    pub ok: bool,
    pub deleted: bool,
}

/// Container delete result; `moved_to` is the default container that
/// received the members.
///
/// List deletes also carry `moved_todos_to`, the key older clients read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDeleteEnvelope {
    pub ok: bool,
    pub deleted: bool,
    pub id: ResourceId,
    pub moved_to: ResourceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_todos_to: Option<ResourceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareEnvelope {
    pub ok: bool,
    pub share: IssuedShare,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharesEnvelope {
    pub ok: bool,
    pub shares: Vec<IssuedShare>,
}

/// Note opened through a share link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedNoteEnvelope {
    pub ok: bool,
    pub note: Note,
    pub can_edit: bool,
}
