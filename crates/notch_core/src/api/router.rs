//! In-process request router.
//!
//! # Responsibility
//! - Map `(method, path, query, Authorization, body)` requests onto the
//!   auth, todo and note services.
//! - Wrap results in `{ok: true, ..}` envelopes and failures in
//!   `{detail}` bodies with the matching HTTP status.
//!
//! # Invariants
//! - One router owns one connection; services are built per request.
//! - Request logs carry method, resource family, status and duration only.
//!   Paths are not logged because share paths embed bearer tokens.

use crate::api::envelope::{
    BootstrapEnvelope, ContainerDeleteEnvelope, DeleteEnvelope, GroupEnvelope, GroupsEnvelope,
    HealthEnvelope, ListEnvelope, ListsEnvelope, LoginEnvelope, NoteEnvelope, NotesEnvelope,
    OkEnvelope, ShareEnvelope, SharedNoteEnvelope, SharesEnvelope, TodoEnvelope, TodosEnvelope,
    UserEnvelope, UsersEnvelope,
};
use crate::api::error::ErrorBody;
use crate::config::CoreConfig;
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::note::{NewNote, NewNoteGroup, NoteGroupPatch, NotePatch};
use crate::model::resource::{now_ms, Timestamp, ValidationError};
use crate::model::share::ShareRequest;
use crate::model::todo::{NewTodo, NewTodoList, TodoListPatch, TodoPatch};
use crate::model::user::{LoginRequest, NewUser, Principal, User};
use crate::query::{NoteFilter, QueryFilter, TodoFilter};
use crate::repo::note_repo::{SqliteNoteGroupRepository, SqliteNoteRepository};
use crate::repo::resource_repo::RepoError;
use crate::repo::share_repo::SqliteShareLinkRepository;
use crate::repo::todo_repo::{SqliteTodoListRepository, SqliteTodoRepository};
use crate::repo::user_repo::SqliteUserRepository;
use crate::service::auth_service::{bearer_token, AuthService};
use crate::service::note_service::NoteService;
use crate::service::todo_service::TodoService;
use crate::service::{ContainerDeleteOutcome, ServiceError};
use log::{error, info, warn};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const SERVICE_NAME: &str = "notch";

type Todos<'conn> = TodoService<SqliteTodoRepository<'conn>, SqliteTodoListRepository<'conn>>;
type Notes<'conn> = NoteService<
    SqliteNoteRepository<'conn>,
    SqliteNoteGroupRepository<'conn>,
    SqliteShareLinkRepository<'conn>,
>;
type Auth<'conn> = AuthService<SqliteUserRepository<'conn>>;

/// Request method understood by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Parses an HTTP method name, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute path without query, e.g. `/api/todos`.
    pub path: String,
    pub query: Option<String>,
    /// Raw `Authorization` header value.
    pub authorization: Option<String>,
    /// JSON body text.
    pub body: Option<String>,
}

impl ApiRequest {
    /// Builds a request. A `?query` suffix on `path` is split off.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path.to_string(), non_empty(query)),
            None => (path, None),
        };
        Self {
            method,
            path,
            query,
            authorization: None,
            body: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = non_empty(&query.into());
        self
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        self.authorization = Some(format!("Bearer {token}"));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// One API response: HTTP status plus JSON body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Routing failure before or around the service call.
#[derive(Debug)]
enum RouteError {
    Service(ServiceError),
    UnknownRoute,
    MethodNotAllowed,
    Encode(serde_json::Error),
}

impl RouteError {
    fn status(&self) -> u16 {
        match self {
            Self::Service(err) => err.status(),
            Self::UnknownRoute => 404,
            Self::MethodNotAllowed => 405,
            Self::Encode(_) => 500,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Service(err) => err.public_detail(),
            Self::UnknownRoute => "Not found".to_string(),
            Self::MethodNotAllowed => "Method not allowed".to_string(),
            Self::Encode(_) => "internal error".to_string(),
        }
    }
}

impl Display for RouteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Service(err) => write!(f, "{err}"),
            Self::UnknownRoute => write!(f, "unknown route"),
            Self::MethodNotAllowed => write!(f, "method not allowed"),
            Self::Encode(err) => write!(f, "response encoding failed: {err}"),
        }
    }
}

impl From<ServiceError> for RouteError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<RepoError> for RouteError {
    fn from(value: RepoError) -> Self {
        Self::Service(value.into())
    }
}

impl From<ValidationError> for RouteError {
    fn from(value: ValidationError) -> Self {
        Self::Service(value.into())
    }
}

type RouteResult = Result<String, RouteError>;

/// Reference authority speaking the JSON API over one SQLite connection.
pub struct Router {
    conn: Connection,
    config: CoreConfig,
}

impl Router {
    /// Opens (and migrates) the database at `config.db_path`.
    pub fn open(config: CoreConfig) -> DbResult<Self> {
        let conn = open_db(&config.db_path)?;
        Ok(Self::from_connection(conn, config))
    }

    /// Router over a fresh in-memory database.
    pub fn in_memory(config: CoreConfig) -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?, config))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection, config: CoreConfig) -> Self {
        Self { conn, config }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Handles `request` at the current wall clock.
    pub fn handle(&self, request: &ApiRequest) -> ApiResponse {
        self.handle_at(request, now_ms())
    }

    /// Handles `request` as if received at `now`.
    pub fn handle_at(&self, request: &ApiRequest, now: Timestamp) -> ApiResponse {
        let started_at = Instant::now();
        let resource = self.resource_family(&request.path);

        let response = match self.route(request, now) {
            Ok(body) => ApiResponse { status: 200, body },
            Err(err) => {
                let status = err.status();
                if status >= 500 {
                    error!(
                        "event=api_request module=api status=error method={} resource={} http_status={} error={}",
                        request.method, resource, status, err
                    );
                }
                let body = serde_json::to_string(&ErrorBody {
                    detail: err.detail(),
                })
                .unwrap_or_else(|_| r#"{"detail":"internal error"}"#.to_string());
                ApiResponse { status, body }
            }
        };

        let duration_ms = started_at.elapsed().as_millis();
        if response.is_success() {
            info!(
                "event=api_request module=api status=ok method={} resource={} http_status={} duration_ms={}",
                request.method, resource, response.status, duration_ms
            );
        } else if response.status < 500 {
            warn!(
                "event=api_request module=api status=error method={} resource={} http_status={} duration_ms={}",
                request.method, resource, response.status, duration_ms
            );
        }
        response
    }

    fn route(&self, request: &ApiRequest, now: Timestamp) -> RouteResult {
        if request.path.trim_end_matches('/') == "/health" {
            return match request.method {
                Method::Get => encode(&HealthEnvelope {
                    ok: true,
                    service: SERVICE_NAME.to_string(),
                }),
                _ => Err(RouteError::MethodNotAllowed),
            };
        }

        let segments = self.api_segments(&request.path)?;
        let method = request.method;
        match segments.as_slice() {
            ["admin", "bootstrap"] => match method {
                Method::Post => {
                    let payload: NewUser = decode_body(request)?;
                    self.auth()?.bootstrap(payload, now)?;
                    encode(&BootstrapEnvelope {
                        ok: true,
                        note: "Bootstrapped".to_string(),
                    })
                }
                _ => Err(RouteError::MethodNotAllowed),
            },
            ["auth", "login"] => match method {
                Method::Post => {
                    let payload: LoginRequest = decode_body(request)?;
                    let session = self.auth()?.login(payload, now)?;
                    encode(&LoginEnvelope {
                        ok: true,
                        token: session.token,
                        user: session.user,
                    })
                }
                _ => Err(RouteError::MethodNotAllowed),
            },
            ["auth", "logout"] => match method {
                Method::Post => {
                    let token = bearer_token(request.authorization.as_deref())?;
                    self.auth()?.logout(token)?;
                    encode(&OkEnvelope { ok: true })
                }
                _ => Err(RouteError::MethodNotAllowed),
            },
            ["me"] => match method {
                Method::Get => match self.principal(request, now)? {
                    Principal::User(user) => encode(&UserEnvelope { ok: true, user }),
                    Principal::Service => {
                        Err(ServiceError::Forbidden("Not a user session").into())
                    }
                },
                _ => Err(RouteError::MethodNotAllowed),
            },
            ["users"] => match method {
                Method::Get => {
                    self.principal(request, now)?;
                    let users = self.auth()?.list_users()?;
                    encode(&UsersEnvelope { ok: true, users })
                }
                _ => Err(RouteError::MethodNotAllowed),
            },
            ["lists", rest @ ..] => self.route_lists(request, rest, now),
            ["todos", rest @ ..] => self.route_todos(request, rest, now),
            ["note-groups", rest @ ..] => self.route_groups(request, rest, now),
            ["notes", rest @ ..] => self.route_notes(request, rest, now),
            ["share", token] => self.route_share(request, token, now),
            _ => Err(RouteError::UnknownRoute),
        }
    }

    fn route_lists(&self, request: &ApiRequest, rest: &[&str], now: Timestamp) -> RouteResult {
        let user = self.user_session(request, now)?;
        let todos = self.todos()?;
        match (rest, request.method) {
            ([], Method::Get) => encode(&ListsEnvelope {
                ok: true,
                lists: todos.list_lists(&user.id, now)?,
            }),
            ([], Method::Post) => {
                let payload: NewTodoList = decode_body(request)?;
                encode(&ListEnvelope {
                    ok: true,
                    list: todos.create_list(&user.id, payload, now)?,
                })
            }
            ([id], Method::Get) => encode(&ListEnvelope {
                ok: true,
                list: todos.get_list(&user.id, id)?,
            }),
            ([id], Method::Patch) => {
                let patch: TodoListPatch = decode_body(request)?;
                encode(&ListEnvelope {
                    ok: true,
                    list: todos.patch_list(&user.id, id, patch, now)?,
                })
            }
            ([id], Method::Delete) => list_deleted(todos.delete_list(&user.id, id, now)?),
            ([] | [_], _) => Err(RouteError::MethodNotAllowed),
            _ => Err(RouteError::UnknownRoute),
        }
    }

    fn route_todos(&self, request: &ApiRequest, rest: &[&str], now: Timestamp) -> RouteResult {
        let user = self.user_session(request, now)?;
        let todos = self.todos()?;
        match (rest, request.method) {
            ([], Method::Get) => {
                let filter = TodoFilter::from_query(request.query.as_deref().unwrap_or(""))?;
                encode(&TodosEnvelope {
                    ok: true,
                    todos: todos.list_todos(&user.id, &filter)?,
                })
            }
            ([], Method::Post) => {
                let payload: NewTodo = decode_body(request)?;
                encode(&TodoEnvelope {
                    ok: true,
                    todo: todos.create_todo(&user.id, payload, now)?,
                })
            }
            ([id], Method::Get) => encode(&TodoEnvelope {
                ok: true,
                todo: todos.get_todo(&user.id, id)?,
            }),
            ([id], Method::Patch) => {
                let patch: TodoPatch = decode_body(request)?;
                encode(&TodoEnvelope {
                    ok: true,
                    todo: todos.patch_todo(&user.id, id, patch, now)?,
                })
            }
            ([id], Method::Delete) => encode(&DeleteEnvelope {
                ok: true,
                deleted: todos.delete_todo(&user.id, id, now)?.deleted,
            }),
            ([id, "restore"], Method::Post) => encode(&TodoEnvelope {
                ok: true,
                todo: todos.restore_todo(&user.id, id, now)?,
            }),
            ([] | [_] | [_, "restore"], _) => Err(RouteError::MethodNotAllowed),
            _ => Err(RouteError::UnknownRoute),
        }
    }

    fn route_groups(&self, request: &ApiRequest, rest: &[&str], now: Timestamp) -> RouteResult {
        let user = self.user_session(request, now)?;
        let notes = self.notes()?;
        match (rest, request.method) {
            ([], Method::Get) => encode(&GroupsEnvelope {
                ok: true,
                groups: notes.list_groups(&user.id, now)?,
            }),
            ([], Method::Post) => {
                let payload: NewNoteGroup = decode_body(request)?;
                encode(&GroupEnvelope {
                    ok: true,
                    group: notes.create_group(&user.id, payload, now)?,
                })
            }
            ([id], Method::Get) => encode(&GroupEnvelope {
                ok: true,
                group: notes.get_group(&user.id, id)?,
            }),
            ([id], Method::Patch) => {
                let patch: NoteGroupPatch = decode_body(request)?;
                encode(&GroupEnvelope {
                    ok: true,
                    group: notes.patch_group(&user.id, id, patch, now)?,
                })
            }
            ([id], Method::Delete) => container_deleted(notes.delete_group(&user.id, id, now)?),
            ([] | [_], _) => Err(RouteError::MethodNotAllowed),
            _ => Err(RouteError::UnknownRoute),
        }
    }

    fn route_notes(&self, request: &ApiRequest, rest: &[&str], now: Timestamp) -> RouteResult {
        let user = self.user_session(request, now)?;
        let notes = self.notes()?;
        match (rest, request.method) {
            ([], Method::Get) => {
                let filter = NoteFilter::from_query(request.query.as_deref().unwrap_or(""))?;
                encode(&NotesEnvelope {
                    ok: true,
                    notes: notes.list_notes(&user.id, &filter)?,
                })
            }
            ([], Method::Post) => {
                let payload: NewNote = decode_body(request)?;
                encode(&NoteEnvelope {
                    ok: true,
                    note: notes.create_note(&user.id, payload, now)?,
                })
            }
            ([id], Method::Get) => encode(&NoteEnvelope {
                ok: true,
                note: notes.get_note(&user.id, id)?,
            }),
            ([id], Method::Patch) => {
                let patch: NotePatch = decode_body(request)?;
                encode(&NoteEnvelope {
                    ok: true,
                    note: notes.patch_note(&user.id, id, patch, now)?,
                })
            }
            ([id], Method::Delete) => encode(&DeleteEnvelope {
                ok: true,
                deleted: notes.delete_note(&user.id, id, now)?.deleted,
            }),
            ([id, "restore"], Method::Post) => encode(&NoteEnvelope {
                ok: true,
                note: notes.restore_note(&user.id, id, now)?,
            }),
            ([id, "shares"], Method::Post) => {
                let payload: ShareRequest = decode_body(request)?;
                encode(&ShareEnvelope {
                    ok: true,
                    share: notes.create_share(&user.id, id, payload, now)?,
                })
            }
            ([id, "shares"], Method::Get) => encode(&SharesEnvelope {
                ok: true,
                shares: notes.list_shares(&user.id, id, now)?,
            }),
            ([] | [_] | [_, "restore"] | [_, "shares"], _) => Err(RouteError::MethodNotAllowed),
            _ => Err(RouteError::UnknownRoute),
        }
    }

    fn route_share(&self, request: &ApiRequest, token: &str, now: Timestamp) -> RouteResult {
        let notes = self.notes()?;
        match request.method {
            Method::Get => {
                let shared = notes.open_share(token, now)?;
                encode(&SharedNoteEnvelope {
                    ok: true,
                    note: shared.note,
                    can_edit: shared.can_edit,
                })
            }
            Method::Patch => {
                let patch: NotePatch = decode_body(request)?;
                encode(&NoteEnvelope {
                    ok: true,
                    note: notes.patch_share(token, patch, now)?,
                })
            }
            _ => Err(RouteError::MethodNotAllowed),
        }
    }

    /// Path segments after the API base path.
    fn api_segments<'p>(&self, path: &'p str) -> Result<Vec<&'p str>, RouteError> {
        let base = self.config.normalized_base_path();
        let rest = path
            .strip_prefix(base.as_str())
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .ok_or(RouteError::UnknownRoute)?;
        Ok(rest.split('/').filter(|segment| !segment.is_empty()).collect())
    }

    fn resource_family<'p>(&self, path: &'p str) -> &'p str {
        match self.api_segments(path) {
            Ok(segments) => segments.first().copied().unwrap_or("root"),
            Err(_) => "unknown",
        }
    }

    fn principal(&self, request: &ApiRequest, now: Timestamp) -> Result<Principal, RouteError> {
        Ok(self
            .auth()?
            .authenticate(request.authorization.as_deref(), now)?)
    }

    fn user_session(&self, request: &ApiRequest, now: Timestamp) -> Result<User, RouteError> {
        match self.principal(request, now)? {
            Principal::User(user) => Ok(user),
            Principal::Service => Err(ServiceError::Forbidden("User session required").into()),
        }
    }

    fn auth(&self) -> Result<Auth<'_>, RouteError> {
        Ok(AuthService::new(SqliteUserRepository::try_new(&self.conn)?)
            .with_session_days(self.config.session_days)
            .with_service_token(self.config.service_token.clone()))
    }

    fn todos(&self) -> Result<Todos<'_>, RouteError> {
        Ok(TodoService::new(
            SqliteTodoRepository::try_new(&self.conn)?,
            SqliteTodoListRepository::try_new(&self.conn)?,
        )
        .with_limits(self.config.list_limits()))
    }

    fn notes(&self) -> Result<Notes<'_>, RouteError> {
        Ok(NoteService::new(
            SqliteNoteRepository::try_new(&self.conn)?,
            SqliteNoteGroupRepository::try_new(&self.conn)?,
            SqliteShareLinkRepository::try_new(&self.conn)?,
        )
        .with_limits(self.config.list_limits())
        .with_app_base_url(self.config.app_base_url.as_str()))
    }
}

fn container_envelope(outcome: ContainerDeleteOutcome) -> ContainerDeleteEnvelope {
    ContainerDeleteEnvelope {
        ok: true,
        deleted: true,
        id: outcome.id,
        moved_to: outcome.moved_to,
        moved_todos_to: None,
    }
}

fn container_deleted(outcome: ContainerDeleteOutcome) -> RouteResult {
    encode(&container_envelope(outcome))
}

fn list_deleted(outcome: ContainerDeleteOutcome) -> RouteResult {
    let mut envelope = container_envelope(outcome);
    envelope.moved_todos_to = Some(envelope.moved_to.clone());
    encode(&envelope)
}

fn encode<T: Serialize>(value: &T) -> RouteResult {
    serde_json::to_string(value).map_err(RouteError::Encode)
}

/// Decodes a JSON body. A missing or blank body reads as `{}`.
fn decode_body<T: DeserializeOwned>(request: &ApiRequest) -> Result<T, RouteError> {
    let text = request
        .body
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or("{}");
    serde_json::from_str(text).map_err(|err| {
        ValidationError::Malformed(format!("Invalid request body: {err}")).into()
    })
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::{ApiRequest, Method, Router};
    use crate::config::CoreConfig;

    fn router() -> Router {
        Router::in_memory(CoreConfig::default()).unwrap()
    }

    #[test]
    fn query_suffix_is_split_from_path() {
        let request = ApiRequest::new(Method::Get, "/api/todos?include_done=1");
        assert_eq!(request.path, "/api/todos");
        assert_eq!(request.query.as_deref(), Some("include_done=1"));
        assert_eq!(Method::parse("patch"), Some(Method::Patch));
        assert_eq!(Method::parse("PUT"), None);
    }

    #[test]
    fn health_lives_outside_base_path() {
        let response = router().handle(&ApiRequest::new(Method::Get, "/health"));
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"ok":true,"service":"notch"}"#);
    }

    #[test]
    fn unknown_routes_and_methods() {
        let router = router();
        let missing = router.handle(&ApiRequest::new(Method::Get, "/api/nope"));
        assert_eq!(missing.status, 404);
        assert_eq!(missing.body, r#"{"detail":"Not found"}"#);

        let outside = router.handle(&ApiRequest::new(Method::Get, "/apix/todos"));
        assert_eq!(outside.status, 404);

        let wrong = router.handle(&ApiRequest::new(Method::Delete, "/api/auth/login"));
        assert_eq!(wrong.status, 405);
    }

    #[test]
    fn item_routes_require_authorization() {
        let response = router().handle(&ApiRequest::new(Method::Get, "/api/todos"));
        assert_eq!(response.status, 401);
        assert_eq!(response.body, r#"{"detail":"Missing Authorization"}"#);
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        let response = router().handle(
            &ApiRequest::new(Method::Post, "/api/admin/bootstrap").with_body("{not json"),
        );
        assert_eq!(response.status, 400);
        assert!(response.body.contains("Invalid request body"));
    }
}
