use notch_core::db::open_db_in_memory;
use notch_core::model::note::{NewNote, NotePatch};
use notch_core::model::share::ShareRequest;
use notch_core::repo::note_repo::{SqliteNoteGroupRepository, SqliteNoteRepository};
use notch_core::repo::share_repo::SqliteShareLinkRepository;
use notch_core::service::note_service::NoteService;
use notch_core::service::ServiceError;
use rusqlite::Connection;

fn notes(
    conn: &Connection,
) -> NoteService<SqliteNoteRepository<'_>, SqliteNoteGroupRepository<'_>, SqliteShareLinkRepository<'_>>
{
    NoteService::new(
        SqliteNoteRepository::try_new(conn).unwrap(),
        SqliteNoteGroupRepository::try_new(conn).unwrap(),
        SqliteShareLinkRepository::try_new(conn).unwrap(),
    )
    .with_app_base_url("http://localhost:8080")
}

#[test]
fn default_share_is_read_only_and_permanent() {
    let conn = open_db_in_memory().unwrap();
    let service = notes(&conn);
    let note = service.create_note("alice", NewNote::new("Recipe"), 1).unwrap();

    let share = service
        .create_share("alice", &note.meta.id, ShareRequest::default(), 2)
        .unwrap();
    assert!(!share.link.can_edit);
    assert_eq!(share.link.expires_at, None);
    assert_eq!(share.link.note_id, note.meta.id);
    assert_eq!(
        share.url,
        format!("http://localhost:8080/share/{}", share.link.token)
    );

    let opened = service.open_share(&share.link.token, 1_000_000).unwrap();
    assert_eq!(opened.note.meta.id, note.meta.id);
    assert!(!opened.can_edit);

    assert!(matches!(
        service.patch_share(&share.link.token, NotePatch::new().body("edit"), 3),
        Err(ServiceError::Forbidden(_))
    ));
}

#[test]
fn several_links_per_note_are_listed() {
    let conn = open_db_in_memory().unwrap();
    let service = notes(&conn);
    let note = service.create_note("alice", NewNote::new("Recipe"), 1).unwrap();
    let first = service
        .create_share("alice", &note.meta.id, ShareRequest::read_only(), 2)
        .unwrap();
    let second = service
        .create_share("alice", &note.meta.id, ShareRequest::editable(), 3)
        .unwrap();
    assert_ne!(first.link.token, second.link.token);

    let listed = service.list_shares("alice", &note.meta.id, 4).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(matches!(
        service.list_shares("mallory", &note.meta.id, 4),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn expired_links_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = notes(&conn);
    let note = service.create_note("alice", NewNote::new("Secret"), 1).unwrap();
    let share = service
        .create_share("alice", &note.meta.id, ShareRequest::editable().expires_in(60), 1_000)
        .unwrap();
    assert_eq!(share.link.expires_at, Some(61_000));

    assert!(service.open_share(&share.link.token, 60_999).is_ok());
    assert!(matches!(
        service.open_share(&share.link.token, 61_000),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn non_positive_expiry_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = notes(&conn);
    let note = service.create_note("alice", NewNote::new("Secret"), 1).unwrap();
    assert!(matches!(
        service.create_share("alice", &note.meta.id, ShareRequest::read_only().expires_in(-5), 2),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn only_visible_notes_can_be_shared() {
    let conn = open_db_in_memory().unwrap();
    let service = notes(&conn);
    let note = service.create_note("alice", NewNote::new("Mine"), 1).unwrap();
    assert!(matches!(
        service.create_share("bob", &note.meta.id, ShareRequest::default(), 2),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn editable_link_patches_with_version_check() {
    let conn = open_db_in_memory().unwrap();
    let service = notes(&conn);
    let note = service.create_note("alice", NewNote::new("Draft"), 1).unwrap();
    let share = service
        .create_share("alice", &note.meta.id, ShareRequest::editable(), 2)
        .unwrap();

    let edited = service
        .patch_share(
            &share.link.token,
            NotePatch::new().expect_version(1).title("Draft (guest)"),
            3,
        )
        .unwrap();
    assert_eq!(edited.title, "Draft (guest)");
    assert_eq!(edited.meta.version, 2);

    assert!(matches!(
        service.patch_share(&share.link.token, NotePatch::new().expect_version(1).body("x"), 4),
        Err(ServiceError::Conflict(_))
    ));
    assert!(matches!(
        service.patch_share(
            &share.link.token,
            NotePatch::new().shared_with(vec!["guest".to_string()]),
            5,
        ),
        Err(ServiceError::Forbidden(_))
    ));
}

#[test]
fn deleted_note_hides_its_links_until_restored() {
    let conn = open_db_in_memory().unwrap();
    let service = notes(&conn);
    let note = service.create_note("alice", NewNote::new("Temp"), 1).unwrap();
    let share = service
        .create_share("alice", &note.meta.id, ShareRequest::read_only(), 2)
        .unwrap();

    service.delete_note("alice", &note.meta.id, 3).unwrap();
    assert!(matches!(
        service.open_share(&share.link.token, 4),
        Err(ServiceError::NotFound { .. })
    ));

    service.restore_note("alice", &note.meta.id, 5).unwrap();
    assert!(service.open_share(&share.link.token, 6).is_ok());
    assert!(matches!(
        service.open_share("unknown-token", 6),
        Err(ServiceError::NotFound { .. })
    ));
}
