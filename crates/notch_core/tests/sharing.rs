use notch_core::db::open_db_in_memory;
use notch_core::model::note::{NewNote, NotePatch};
use notch_core::model::resource::ValidationError;
use notch_core::model::todo::{NewTodo, NewTodoList, TodoPatch};
use notch_core::query::{NoteFilter, TodoFilter};
use notch_core::repo::note_repo::{SqliteNoteGroupRepository, SqliteNoteRepository};
use notch_core::repo::share_repo::SqliteShareLinkRepository;
use notch_core::repo::todo_repo::{SqliteTodoListRepository, SqliteTodoRepository};
use notch_core::service::note_service::NoteService;
use notch_core::service::todo_service::TodoService;
use notch_core::service::ServiceError;
use rusqlite::Connection;

fn todos(conn: &Connection) -> TodoService<SqliteTodoRepository<'_>, SqliteTodoListRepository<'_>> {
    TodoService::new(
        SqliteTodoRepository::try_new(conn).unwrap(),
        SqliteTodoListRepository::try_new(conn).unwrap(),
    )
}

fn notes(
    conn: &Connection,
) -> NoteService<SqliteNoteRepository<'_>, SqliteNoteGroupRepository<'_>, SqliteShareLinkRepository<'_>>
{
    NoteService::new(
        SqliteNoteRepository::try_new(conn).unwrap(),
        SqliteNoteGroupRepository::try_new(conn).unwrap(),
        SqliteShareLinkRepository::try_new(conn).unwrap(),
    )
}

#[test]
fn shared_member_can_list_fetch_and_patch() {
    let conn = open_db_in_memory().unwrap();
    let service = todos(&conn);
    let todo = service
        .create_todo(
            "alice",
            NewTodo::new("Plan trip").shared_with(vec!["bob".to_string()]),
            1,
        )
        .unwrap();

    let listed = service.list_todos("bob", &TodoFilter::new()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(service.get_todo("bob", &todo.meta.id).unwrap().title, "Plan trip");

    let patched = service
        .patch_todo("bob", &todo.meta.id, TodoPatch::new().done(true), 2)
        .unwrap();
    assert!(patched.done);
    assert_eq!(patched.meta.created_by, "alice");
}

#[test]
fn stranger_sees_not_found_everywhere() {
    let conn = open_db_in_memory().unwrap();
    let service = todos(&conn);
    let todo = service
        .create_todo("alice", NewTodo::new("private"), 1)
        .unwrap();

    assert!(service
        .list_todos("mallory", &TodoFilter::new().include_deleted(true))
        .unwrap()
        .is_empty());
    assert!(matches!(
        service.get_todo("mallory", &todo.meta.id),
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        service.patch_todo("mallory", &todo.meta.id, TodoPatch::new().done(true), 2),
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        service.delete_todo("mallory", &todo.meta.id, 2),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn only_owner_changes_sharing() {
    let conn = open_db_in_memory().unwrap();
    let service = todos(&conn);
    let todo = service
        .create_todo(
            "alice",
            NewTodo::new("shared").shared_with(vec!["bob".to_string()]),
            1,
        )
        .unwrap();

    let err = service
        .patch_todo(
            "bob",
            &todo.meta.id,
            TodoPatch::new().shared_with(vec!["bob".to_string(), "carol".to_string()]),
            2,
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let updated = service
        .patch_todo(
            "alice",
            &todo.meta.id,
            TodoPatch::new().shared_with(vec!["carol".to_string(), "alice".to_string()]),
            3,
        )
        .unwrap();
    assert_eq!(updated.meta.shared_with, vec!["carol".to_string()]);
    assert!(matches!(
        service.get_todo("bob", &todo.meta.id),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn assignee_is_validated_against_post_patch_share_set() {
    let conn = open_db_in_memory().unwrap();
    let service = todos(&conn);
    let todo = service.create_todo("alice", NewTodo::new("chore"), 1).unwrap();

    let err = service
        .patch_todo(
            "alice",
            &todo.meta.id,
            TodoPatch::new().assigned_to(Some("bob".to_string())),
            2,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::AssigneeNotShared(_))
    ));

    let assigned = service
        .patch_todo(
            "alice",
            &todo.meta.id,
            TodoPatch::new()
                .shared_with(vec!["bob".to_string()])
                .assigned_to(Some("bob".to_string())),
            3,
        )
        .unwrap();
    assert_eq!(assigned.assigned_to.as_deref(), Some("bob"));
    assert_eq!(assigned.meta.version, 2);
}

#[test]
fn shared_list_admits_member_items() {
    let conn = open_db_in_memory().unwrap();
    let service = todos(&conn);
    let list = service
        .create_list(
            "alice",
            NewTodoList {
                name: "Household".to_string(),
                shared_with: vec!["bob".to_string()],
            },
            1,
        )
        .unwrap();

    let todo = service
        .create_todo("bob", NewTodo::new("Fix sink").in_list(list.meta.id.clone()), 2)
        .unwrap();
    let scoped = service
        .list_todos("bob", &TodoFilter::new().in_list(list.meta.id.clone()))
        .unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].meta.id, todo.meta.id);

    assert!(matches!(
        service.create_todo("carol", NewTodo::new("x").in_list(list.meta.id), 3),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn note_search_combines_scope_and_text() {
    let conn = open_db_in_memory().unwrap();
    let service = notes(&conn);
    let work = service
        .create_group("alice", notch_core::NewNoteGroup::new("Work"), 1)
        .unwrap();
    service
        .create_note(
            "alice",
            NewNote::new("Standup").body("Discuss ROADMAP").in_group(work.meta.id.clone()),
            2,
        )
        .unwrap();
    service
        .create_note("alice", NewNote::new("Shopping").body("roadmap atlas"), 3)
        .unwrap();

    let everywhere = service
        .list_notes("alice", &NoteFilter::new().matching("roadmap"))
        .unwrap();
    assert_eq!(everywhere.len(), 2);

    let scoped = service
        .list_notes(
            "alice",
            &NoteFilter::new().matching("roadmap").in_group(work.meta.id.clone()),
        )
        .unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].title, "Standup");

    let err = service
        .patch_note(
            "bob",
            &scoped[0].meta.id,
            NotePatch::new().title("hijack"),
            4,
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}
