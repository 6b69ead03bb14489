//! Typed API client.
//!
//! # Responsibility
//! - Turn typed calls into `ApiRequest`s with the session token injected.
//! - Decode envelopes and classify failures into `ClientError`.
//!
//! # Invariants
//! - The client never retries; callers decide from `ErrorKind`.
//! - Any 401 clears the session (and its persisted copy).
//! - Logs carry method, status and duration only.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::pager::Listing;
use crate::session::{Session, SessionStore};
use crate::transport::Transport;
use log::{debug, info, warn};
use notch_core::api::envelope::{
    BootstrapEnvelope, ContainerDeleteEnvelope, DeleteEnvelope, GroupEnvelope, GroupsEnvelope,
    HealthEnvelope, ListEnvelope, ListsEnvelope, LoginEnvelope, NoteEnvelope, NotesEnvelope,
    OkEnvelope, ShareEnvelope, SharedNoteEnvelope, SharesEnvelope, TodoEnvelope, TodosEnvelope,
    UserEnvelope, UsersEnvelope,
};
use notch_core::api::{ApiRequest, ApiResponse, ErrorKind, Method};
use notch_core::model::note::{NewNote, NewNoteGroup, Note, NoteGroup, NoteGroupPatch, NotePatch};
use notch_core::model::share::{IssuedShare, ShareRequest};
use notch_core::model::todo::{NewTodo, NewTodoList, Todo, TodoList, TodoListPatch, TodoPatch};
use notch_core::model::user::{LoginRequest, NewUser, User};
use notch_core::query::{NoteFilter, QueryFilter, TodoFilter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Instant;

/// Typed client over a `Transport`.
pub struct NotchClient<T> {
    transport: T,
    session: Session,
    base_path: String,
    store: Option<SessionStore>,
}

impl<T: Transport> NotchClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, &ClientConfig::default())
    }

    pub fn with_config(transport: T, config: &ClientConfig) -> Self {
        Self {
            transport,
            session: Session::new(),
            base_path: config.normalized_base_path(),
            store: config.session_file.clone().map(SessionStore::new),
        }
    }

    /// Uses `session` instead of a fresh one, e.g. to share it across clients.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Loads a persisted token into the session, when a store is configured.
    pub fn restore_session(&self) -> ClientResult<bool> {
        match &self.store {
            Some(store) => store
                .restore(&self.session)
                .map_err(|err| ClientError::transport(err.to_string())),
            None => Ok(false),
        }
    }

    pub fn health(&self) -> ClientResult<HealthEnvelope> {
        self.call(ApiRequest::new(Method::Get, "/health"))
    }

    pub fn bootstrap(&self, payload: &NewUser) -> ClientResult<()> {
        let _: BootstrapEnvelope = self.send_json(Method::Post, "/admin/bootstrap", payload)?;
        Ok(())
    }

    /// Logs in and stores the issued token in the session.
    pub fn login(&self, handle: &str, password: &str) -> ClientResult<User> {
        let payload = LoginRequest::new(handle, password);
        let envelope: LoginEnvelope = self.send_json(Method::Post, "/auth/login", &payload)?;
        self.session.set(envelope.token.as_str());
        if let Some(store) = &self.store {
            if let Err(err) = store.save(&envelope.token) {
                warn!("event=session_persist module=client status=error error={err}");
            }
        }
        Ok(envelope.user)
    }

    /// Ends the server session when one is held, then clears local state.
    pub fn logout(&self) -> ClientResult<()> {
        let outcome = if self.session.is_authenticated() {
            self.call::<OkEnvelope>(self.request(Method::Post, "/auth/logout"))
                .map(|_| ())
        } else {
            Ok(())
        };
        self.forget_session();
        match outcome {
            Err(err) if err.kind == ErrorKind::Auth => Ok(()),
            other => other,
        }
    }

    pub fn me(&self) -> ClientResult<User> {
        let envelope: UserEnvelope = self.get("/me")?;
        Ok(envelope.user)
    }

    pub fn list_users(&self) -> ClientResult<Vec<User>> {
        let envelope: UsersEnvelope = self.get("/users")?;
        Ok(envelope.users)
    }

    pub fn list_lists(&self) -> ClientResult<Vec<TodoList>> {
        let envelope: ListsEnvelope = self.get("/lists")?;
        Ok(envelope.lists)
    }

    pub fn create_list(&self, payload: &NewTodoList) -> ClientResult<TodoList> {
        let envelope: ListEnvelope = self.send_json(Method::Post, "/lists", payload)?;
        Ok(envelope.list)
    }

    pub fn get_list(&self, id: &str) -> ClientResult<TodoList> {
        let envelope: ListEnvelope = self.get(&format!("/lists/{id}"))?;
        Ok(envelope.list)
    }

    pub fn patch_list(&self, id: &str, patch: &TodoListPatch) -> ClientResult<TodoList> {
        let envelope: ListEnvelope =
            self.send_json(Method::Patch, &format!("/lists/{id}"), patch)?;
        Ok(envelope.list)
    }

    pub fn delete_list(&self, id: &str) -> ClientResult<ContainerDeleteEnvelope> {
        self.call(self.request(Method::Delete, &format!("/lists/{id}")))
    }

    /// One page of todos.
    pub fn list_todos(&self, filter: &TodoFilter) -> ClientResult<Vec<Todo>> {
        let request = self
            .request(Method::Get, "/todos")
            .with_query(filter.to_query());
        let envelope: TodosEnvelope = self.call(request)?;
        Ok(envelope.todos)
    }

    /// Lazy listing walking every page matching `filter`.
    pub fn todos(&self, filter: TodoFilter, page_size: u32) -> Listing<'_, Todo> {
        Listing::new(filter.offset, page_size, move |offset, limit| {
            self.list_todos(&filter.clone().offset(offset).limit(limit))
        })
    }

    pub fn create_todo(&self, payload: &NewTodo) -> ClientResult<Todo> {
        let envelope: TodoEnvelope = self.send_json(Method::Post, "/todos", payload)?;
        Ok(envelope.todo)
    }

    pub fn get_todo(&self, id: &str) -> ClientResult<Todo> {
        let envelope: TodoEnvelope = self.get(&format!("/todos/{id}"))?;
        Ok(envelope.todo)
    }

    pub fn patch_todo(&self, id: &str, patch: &TodoPatch) -> ClientResult<Todo> {
        let envelope: TodoEnvelope =
            self.send_json(Method::Patch, &format!("/todos/{id}"), patch)?;
        Ok(envelope.todo)
    }

    pub fn delete_todo(&self, id: &str) -> ClientResult<DeleteEnvelope> {
        self.call(self.request(Method::Delete, &format!("/todos/{id}")))
    }

    pub fn restore_todo(&self, id: &str) -> ClientResult<Todo> {
        let envelope: TodoEnvelope =
            self.call(self.request(Method::Post, &format!("/todos/{id}/restore")))?;
        Ok(envelope.todo)
    }

    pub fn list_groups(&self) -> ClientResult<Vec<NoteGroup>> {
        let envelope: GroupsEnvelope = self.get("/note-groups")?;
        Ok(envelope.groups)
    }

    pub fn create_group(&self, payload: &NewNoteGroup) -> ClientResult<NoteGroup> {
        let envelope: GroupEnvelope = self.send_json(Method::Post, "/note-groups", payload)?;
        Ok(envelope.group)
    }

    pub fn get_group(&self, id: &str) -> ClientResult<NoteGroup> {
        let envelope: GroupEnvelope = self.get(&format!("/note-groups/{id}"))?;
        Ok(envelope.group)
    }

    pub fn patch_group(&self, id: &str, patch: &NoteGroupPatch) -> ClientResult<NoteGroup> {
        let envelope: GroupEnvelope =
            self.send_json(Method::Patch, &format!("/note-groups/{id}"), patch)?;
        Ok(envelope.group)
    }

    pub fn delete_group(&self, id: &str) -> ClientResult<ContainerDeleteEnvelope> {
        self.call(self.request(Method::Delete, &format!("/note-groups/{id}")))
    }

    /// One page of notes.
    pub fn list_notes(&self, filter: &NoteFilter) -> ClientResult<Vec<Note>> {
        let request = self
            .request(Method::Get, "/notes")
            .with_query(filter.to_query());
        let envelope: NotesEnvelope = self.call(request)?;
        Ok(envelope.notes)
    }

    pub fn notes(&self, filter: NoteFilter, page_size: u32) -> Listing<'_, Note> {
        Listing::new(filter.offset, page_size, move |offset, limit| {
            self.list_notes(&filter.clone().offset(offset).limit(limit))
        })
    }

    pub fn create_note(&self, payload: &NewNote) -> ClientResult<Note> {
        let envelope: NoteEnvelope = self.send_json(Method::Post, "/notes", payload)?;
        Ok(envelope.note)
    }

    pub fn get_note(&self, id: &str) -> ClientResult<Note> {
        let envelope: NoteEnvelope = self.get(&format!("/notes/{id}"))?;
        Ok(envelope.note)
    }

    pub fn patch_note(&self, id: &str, patch: &NotePatch) -> ClientResult<Note> {
        let envelope: NoteEnvelope =
            self.send_json(Method::Patch, &format!("/notes/{id}"), patch)?;
        Ok(envelope.note)
    }

    pub fn delete_note(&self, id: &str) -> ClientResult<DeleteEnvelope> {
        self.call(self.request(Method::Delete, &format!("/notes/{id}")))
    }

    pub fn restore_note(&self, id: &str) -> ClientResult<Note> {
        let envelope: NoteEnvelope =
            self.call(self.request(Method::Post, &format!("/notes/{id}/restore")))?;
        Ok(envelope.note)
    }

    pub fn create_share(&self, note_id: &str, request: &ShareRequest) -> ClientResult<IssuedShare> {
        let envelope: ShareEnvelope =
            self.send_json(Method::Post, &format!("/notes/{note_id}/shares"), request)?;
        Ok(envelope.share)
    }

    pub fn list_shares(&self, note_id: &str) -> ClientResult<Vec<IssuedShare>> {
        let envelope: SharesEnvelope = self.get(&format!("/notes/{note_id}/shares"))?;
        Ok(envelope.shares)
    }

    /// Opens a share link. No session is required.
    pub fn open_share(&self, token: &str) -> ClientResult<SharedNoteEnvelope> {
        self.call(self.request(Method::Get, &format!("/share/{token}")))
    }

    pub fn patch_share(&self, token: &str, patch: &NotePatch) -> ClientResult<Note> {
        let envelope: NoteEnvelope =
            self.send_json(Method::Patch, &format!("/share/{token}"), patch)?;
        Ok(envelope.note)
    }

    fn request(&self, method: Method, route: &str) -> ApiRequest {
        ApiRequest::new(method, format!("{}{route}", self.base_path))
    }

    fn get<R: DeserializeOwned>(&self, route: &str) -> ClientResult<R> {
        self.call(self.request(Method::Get, route))
    }

    fn send_json<B, R>(&self, method: Method, route: &str, body: &B) -> ClientResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_string(body).map_err(|err| ClientError {
            kind: ErrorKind::Validation,
            status: None,
            detail: format!("request encoding failed: {err}"),
        })?;
        self.call(self.request(method, route).with_body(body))
    }

    fn call<R: DeserializeOwned>(&self, mut request: ApiRequest) -> ClientResult<R> {
        if let Some(token) = self.session.token() {
            request = request.with_bearer(&token);
        }

        let started_at = Instant::now();
        let response = self.transport.send(&request).map_err(|err| {
            warn!(
                "event=client_call module=client status=error method={} error_kind={}",
                request.method, err.kind
            );
            err
        })?;
        debug!(
            "event=client_call module=client status={} method={} http_status={} duration_ms={}",
            if response.is_success() { "ok" } else { "error" },
            request.method,
            response.status,
            started_at.elapsed().as_millis()
        );

        if response.status == 401 {
            self.forget_session();
        }
        decode_response(&response)
    }

    fn forget_session(&self) {
        if self.session.is_authenticated() {
            info!("event=session_clear module=client status=ok");
        }
        self.session.clear();
        if let Some(store) = &self.store {
            if let Err(err) = store.clear() {
                warn!("event=session_persist module=client status=error error={err}");
            }
        }
    }
}

fn decode_response<R: DeserializeOwned>(response: &ApiResponse) -> ClientResult<R> {
    if !response.is_success() {
        return Err(ClientError::from_response(response.status, &response.body));
    }
    serde_json::from_str(&response.body)
        .map_err(|err| ClientError::undecodable(response.status, &err))
}
