use notch_core::db::open_db_in_memory;
use notch_core::model::todo::{NewTodo, TodoPatch};
use notch_core::query::TodoFilter;
use notch_core::repo::todo_repo::{SqliteTodoListRepository, SqliteTodoRepository};
use notch_core::service::todo_service::TodoService;
use notch_core::service::ServiceError;
use rusqlite::Connection;

fn service(
    conn: &Connection,
) -> TodoService<SqliteTodoRepository<'_>, SqliteTodoListRepository<'_>> {
    TodoService::new(
        SqliteTodoRepository::try_new(conn).unwrap(),
        SqliteTodoListRepository::try_new(conn).unwrap(),
    )
}

fn ids(todos: &[notch_core::Todo]) -> Vec<String> {
    todos.iter().map(|todo| todo.meta.id.clone()).collect()
}

#[test]
fn buy_milk_scenario() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let created = service
        .create_todo("u1", NewTodo::new("Buy milk"), 1_000)
        .unwrap();
    assert_eq!(created.meta.version, 1);
    assert!(!created.done);
    assert_eq!(created.list_id, None);

    let patched = service
        .patch_todo("u1", &created.meta.id, TodoPatch::new().done(true), 1_000)
        .unwrap();
    assert_eq!(patched.meta.version, 2);
    assert!(patched.done);
    assert!(patched.meta.updated_at > created.meta.updated_at);
    assert_eq!(patched.meta.created_at, created.meta.created_at);

    let first = service.delete_todo("u1", &created.meta.id, 2_000).unwrap();
    assert!(first.deleted);
    let second = service.delete_todo("u1", &created.meta.id, 3_000).unwrap();
    assert!(!second.deleted);

    let stored = service
        .list_todos(
            "u1",
            &TodoFilter::new().include_done(true).include_deleted(true),
        )
        .unwrap();
    assert_eq!(stored[0].meta.version, 3);
}

#[test]
fn versions_advance_by_exactly_one_per_patch() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let todo = service.create_todo("u1", NewTodo::new("count"), 10).unwrap();

    let mut previous = todo.meta.version;
    for step in 0..5 {
        let patched = service
            .patch_todo(
                "u1",
                &todo.meta.id,
                TodoPatch::new().title(format!("count {step}")),
                10,
            )
            .unwrap();
        assert_eq!(patched.meta.version, previous + 1);
        previous = patched.meta.version;
    }
    assert_eq!(service.get_todo("u1", &todo.meta.id).unwrap().meta.version, 6);
}

#[test]
fn stale_if_version_is_a_conflict() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let todo = service.create_todo("u1", NewTodo::new("race"), 10).unwrap();

    service
        .patch_todo("u1", &todo.meta.id, TodoPatch::new().expect_version(1).done(true), 11)
        .unwrap();
    let err = service
        .patch_todo("u1", &todo.meta.id, TodoPatch::new().expect_version(1).done(false), 12)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(ref detail) if detail == "Version conflict"));
}

#[test]
fn delete_then_restore_round_trips() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let original = service
        .create_todo("u1", NewTodo::new("keep me").remind_at(5_000), 100)
        .unwrap();

    service.delete_todo("u1", &original.meta.id, 200).unwrap();
    assert!(service.list_todos("u1", &TodoFilter::new()).unwrap().is_empty());
    assert!(matches!(
        service.get_todo("u1", &original.meta.id),
        Err(ServiceError::NotFound { .. })
    ));

    let restored = service.restore_todo("u1", &original.meta.id, 300).unwrap();
    assert_eq!(restored.meta.version, original.meta.version + 2);
    assert_eq!(restored.meta.updated_at, 300);
    let mut expected = original.clone();
    expected.meta.version = restored.meta.version;
    expected.meta.updated_at = restored.meta.updated_at;
    assert_eq!(restored, expected);
    assert_eq!(
        ids(&service.list_todos("u1", &TodoFilter::new()).unwrap()),
        vec![original.meta.id.clone()]
    );
}

#[test]
fn restore_rejects_live_and_unknown_items() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let todo = service.create_todo("u1", NewTodo::new("live"), 1).unwrap();

    assert!(matches!(
        service.restore_todo("u1", &todo.meta.id, 2),
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        service.restore_todo("u1", "no-such-id", 2),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn deleted_only_is_subset_of_include_deleted() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let a = service.create_todo("u1", NewTodo::new("a"), 1).unwrap();
    let b = service.create_todo("u1", NewTodo::new("b"), 2).unwrap();
    service.create_todo("u1", NewTodo::new("c"), 3).unwrap();
    service.delete_todo("u1", &a.meta.id, 4).unwrap();
    service
        .patch_todo("u1", &b.meta.id, TodoPatch::new().done(true), 5)
        .unwrap();

    let all = ids(
        &service
            .list_todos("u1", &TodoFilter::new().include_done(true).include_deleted(true))
            .unwrap(),
    );
    let deleted = ids(
        &service
            .list_todos("u1", &TodoFilter::new().include_done(true).deleted_only(true))
            .unwrap(),
    );
    assert_eq!(all.len(), 3);
    assert_eq!(deleted, vec![a.meta.id.clone()]);
    assert!(deleted.iter().all(|id| all.contains(id)));

    let open = service.list_todos("u1", &TodoFilter::new()).unwrap();
    assert!(open.iter().all(|todo| !todo.done));
    assert_eq!(open.len(), 1);
}

#[test]
fn text_query_limit_and_offset() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    for (index, title) in ["Buy milk", "buy bread", "Call mom", "50% off"].iter().enumerate() {
        service
            .create_todo("u1", NewTodo::new(*title), index as i64)
            .unwrap();
    }

    let buys = service
        .list_todos("u1", &TodoFilter::new().matching("BUY"))
        .unwrap();
    assert_eq!(buys.len(), 2);

    let percent = service
        .list_todos("u1", &TodoFilter::new().matching("%"))
        .unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].title, "50% off");

    let page = service
        .list_todos("u1", &TodoFilter::new().limit(2).offset(1))
        .unwrap();
    let everything = service.list_todos("u1", &TodoFilter::new()).unwrap();
    assert_eq!(ids(&page), ids(&everything[1..3]));
}

#[test]
fn reminders_are_reported_until_marked_sent() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let todo = service
        .create_todo("u1", NewTodo::new("ping").remind_at(500), 1)
        .unwrap();

    assert!(service.due_reminders(499, 10).unwrap().is_empty());
    let due = service.due_reminders(500, 10).unwrap();
    assert_eq!(ids(&due), vec![todo.meta.id.clone()]);

    let sent = service.mark_reminder_sent(&todo.meta.id, 600).unwrap();
    assert_eq!(sent.remind_sent_at, Some(600));
    assert_eq!(sent.meta.version, 2);
    assert!(service.due_reminders(1_000, 10).unwrap().is_empty());

    let moved = service
        .patch_todo("u1", &todo.meta.id, TodoPatch::new().remind_at(Some(2_000)), 700)
        .unwrap();
    assert_eq!(moved.remind_sent_at, None);
    assert_eq!(service.due_reminders(2_000, 10).unwrap().len(), 1);
}
