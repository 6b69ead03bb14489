use notch_client::{
    ClientConfig, ErrorKind, LocalTransport, NotchClient, Session, SessionStore,
};
use notch_core::model::note::{NewNote, NotePatch};
use notch_core::model::share::ShareRequest;
use notch_core::model::todo::{NewTodo, TodoPatch};
use notch_core::model::user::NewUser;
use notch_core::query::TodoFilter;
use notch_core::repo::user_repo::SqliteUserRepository;
use notch_core::service::auth_service::AuthService;
use notch_core::{now_ms, CoreConfig, Router};

fn transport() -> LocalTransport {
    LocalTransport::new(Router::in_memory(CoreConfig::default()).unwrap())
}

fn signed_in(transport: &LocalTransport) -> NotchClient<&LocalTransport> {
    let client = NotchClient::new(transport);
    client.bootstrap(&NewUser::new("alice", "alice-pw")).unwrap();
    client.login("alice", "alice-pw").unwrap();
    client
}

fn add_user(transport: &LocalTransport, handle: &str, password: &str) -> String {
    let users = SqliteUserRepository::try_new(transport.router().connection()).unwrap();
    AuthService::new(users)
        .create_user(NewUser::new(handle, password), now_ms())
        .unwrap()
        .id
}

#[test]
fn buy_milk_cycle() {
    let transport = transport();
    let client = signed_in(&transport);
    assert!(client.health().unwrap().ok);

    let todo = client.create_todo(&NewTodo::new("Buy milk")).unwrap();
    assert_eq!(todo.meta.version, 1);
    assert!(!todo.done);

    let done = client
        .patch_todo(&todo.meta.id, &TodoPatch::new().done(true))
        .unwrap();
    assert_eq!(done.meta.version, 2);
    assert!(done.done);
    assert!(done.meta.updated_at > todo.meta.updated_at);

    let first = client.delete_todo(&todo.meta.id).unwrap();
    assert!(first.ok && first.deleted);
    let second = client.delete_todo(&todo.meta.id).unwrap();
    assert!(second.ok && !second.deleted);
}

#[test]
fn stale_patch_surfaces_conflict_without_retry() {
    let transport = transport();
    let client = signed_in(&transport);
    let todo = client.create_todo(&NewTodo::new("race")).unwrap();

    client
        .patch_todo(&todo.meta.id, &TodoPatch::new().expect_version(1).title("mine"))
        .unwrap();
    let err = client
        .patch_todo(&todo.meta.id, &TodoPatch::new().expect_version(1).title("theirs"))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(err.status, Some(409));
    assert_eq!(err.detail, "Version conflict");
    assert!(err.is_retryable());

    let current = client.get_todo(&todo.meta.id).unwrap();
    assert_eq!(current.title, "mine");
    assert_eq!(current.meta.version, 2);
}

#[test]
fn delete_and_restore_round_trip() {
    let transport = transport();
    let client = signed_in(&transport);
    let original = client.create_todo(&NewTodo::new("keep")).unwrap();

    client.delete_todo(&original.meta.id).unwrap();
    assert!(client.list_todos(&TodoFilter::new()).unwrap().is_empty());
    let trash = client
        .list_todos(&TodoFilter::new().deleted_only(true))
        .unwrap();
    assert_eq!(trash.len(), 1);

    let restored = client.restore_todo(&original.meta.id).unwrap();
    assert_eq!(restored.meta.version, original.meta.version + 2);
    assert_eq!(restored.title, original.title);
    assert_eq!(restored.meta.created_at, original.meta.created_at);
    assert_eq!(client.list_todos(&TodoFilter::new()).unwrap().len(), 1);

    let err = client.restore_todo(&original.meta.id).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn members_see_shared_items_and_strangers_do_not() {
    let transport = transport();
    let alice = signed_in(&transport);
    let bob_id = add_user(&transport, "bob", "bob-pw");
    add_user(&transport, "carol", "carol-pw");

    let todo = alice
        .create_todo(&NewTodo::new("Plan trip").shared_with(vec![bob_id.clone()]))
        .unwrap();

    let bob = NotchClient::new(&transport);
    bob.login("bob", "bob-pw").unwrap();
    assert_eq!(bob.list_todos(&TodoFilter::new()).unwrap().len(), 1);
    let patched = bob
        .patch_todo(&todo.meta.id, &TodoPatch::new().done(true))
        .unwrap();
    assert!(patched.done);

    let carol = NotchClient::new(&transport);
    carol.login("carol", "carol-pw").unwrap();
    assert!(carol
        .list_todos(&TodoFilter::new().include_done(true))
        .unwrap()
        .is_empty());
    let err = carol.get_todo(&todo.meta.id).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.detail, "Not found");
}

#[test]
fn share_links_default_to_read_only() {
    let transport = transport();
    let client = signed_in(&transport);
    let note = client.create_note(&NewNote::new("Recipe").body("flour")).unwrap();

    let share = client
        .create_share(&note.meta.id, &ShareRequest::default())
        .unwrap();
    assert!(!share.link.can_edit);
    assert_eq!(share.link.expires_at, None);
    assert_eq!(client.list_shares(&note.meta.id).unwrap(), vec![share.clone()]);

    let guest = NotchClient::new(&transport);
    let opened = guest.open_share(&share.link.token).unwrap();
    assert_eq!(opened.note.body_md, "flour");
    assert!(!opened.can_edit);

    let err = guest
        .patch_share(&share.link.token, &NotePatch::new().body("sugar"))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
}

#[test]
fn pager_walks_every_page() {
    let transport = transport();
    let client = signed_in(&transport);
    for index in 0..7 {
        client
            .create_todo(&NewTodo::new(format!("item {index}")))
            .unwrap();
    }

    let mut listing = client.todos(TodoFilter::new(), 3);
    let titles: Vec<String> = listing
        .by_ref()
        .map(|todo| todo.unwrap().title)
        .collect();
    assert_eq!(titles.len(), 7);

    listing.restart();
    assert_eq!(listing.count(), 7);
}

#[test]
fn pager_keeps_going_when_server_caps_pages() {
    let router = Router::in_memory(CoreConfig {
        list_limit_default: 2,
        list_limit_max: 2,
        ..CoreConfig::default()
    })
    .unwrap();
    let transport = LocalTransport::new(router);
    let client = signed_in(&transport);
    for index in 0..5 {
        client
            .create_todo(&NewTodo::new(format!("item {index}")))
            .unwrap();
    }
    assert_eq!(client.list_todos(&TodoFilter::new().limit(10)).unwrap().len(), 2);

    let titles: Vec<String> = client
        .todos(TodoFilter::new(), 10)
        .map(|todo| todo.unwrap().title)
        .collect();
    assert_eq!(titles.len(), 5);
}

#[test]
fn unauthorized_response_clears_session() {
    let transport = transport();
    let client = signed_in(&transport);
    let session = client.session().clone();
    assert!(session.is_authenticated());

    let stale = NotchClient::new(&transport).with_session(Session::with_token("expired"));
    let err = stale.me().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Auth);
    assert!(!stale.session().is_authenticated());
    assert!(session.is_authenticated());

    let anonymous = NotchClient::new(&transport);
    let err = anonymous.create_todo(&NewTodo::new("x")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Auth);
    assert_eq!(err.detail, "Missing Authorization");
}

#[test]
fn logout_ends_the_server_session() {
    let transport = transport();
    let client = signed_in(&transport);
    let token = client.session().token().unwrap();

    client.logout().unwrap();
    assert!(!client.session().is_authenticated());
    client.logout().unwrap();

    let replay = NotchClient::new(&transport).with_session(Session::with_token(token));
    assert_eq!(replay.me().unwrap_err().kind, ErrorKind::Auth);
}

#[test]
fn session_file_survives_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();
    let config = ClientConfig {
        session_file: Some(path.clone()),
        ..ClientConfig::default()
    };

    let transport = transport();
    let first = NotchClient::with_config(&transport, &config);
    first.bootstrap(&NewUser::new("alice", "alice-pw")).unwrap();
    first.login("alice", "alice-pw").unwrap();

    let second = NotchClient::with_config(&transport, &config);
    assert!(second.restore_session().unwrap());
    assert_eq!(second.me().unwrap().handle, "alice");

    second.logout().unwrap();
    let store = SessionStore::new(&path);
    assert_eq!(store.load().unwrap(), None);
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("dark"));
}
