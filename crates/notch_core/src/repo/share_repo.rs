//! Share-link persistence.

use crate::model::resource::Timestamp;
use crate::model::share::ShareLink;
use crate::repo::resource_repo::{
    bool_to_int, ensure_connection_ready, int_to_bool, map_unique_violation, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const SHARE_SELECT_SQL: &str = "SELECT
    token,
    note_id,
    can_edit,
    created_by,
    created_at,
    expires_at
FROM note_shares";

/// Repository interface for note share links.
pub trait ShareLinkRepository {
    fn insert_share(&self, link: &ShareLink) -> RepoResult<()>;
    fn get_share(&self, token: &str) -> RepoResult<Option<ShareLink>>;
    /// Links issued for one note, newest first.
    fn list_shares(&self, note_id: &str) -> RepoResult<Vec<ShareLink>>;
    /// Drops links whose expiry has passed. Returns removed count.
    fn purge_expired(&self, now: Timestamp) -> RepoResult<usize>;
}

/// SQLite-backed share-link repository.
pub struct SqliteShareLinkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteShareLinkRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "note_shares")?;
        Ok(Self { conn })
    }
}

impl ShareLinkRepository for SqliteShareLinkRepository<'_> {
    fn insert_share(&self, link: &ShareLink) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO note_shares (
                    token,
                    note_id,
                    can_edit,
                    created_by,
                    created_at,
                    expires_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    link.token,
                    link.note_id,
                    bool_to_int(link.can_edit),
                    link.created_by,
                    link.created_at,
                    link.expires_at,
                ],
            )
            .map_err(|err| map_unique_violation(err, "share", "token"))?;
        Ok(())
    }

    fn get_share(&self, token: &str) -> RepoResult<Option<ShareLink>> {
        let row = self
            .conn
            .query_row(
                &format!("{SHARE_SELECT_SQL} WHERE token = ?1;"),
                [token],
                |row| Ok(raw_share(row)),
            )
            .optional()?;
        row.transpose()
    }

    fn list_shares(&self, note_id: &str) -> RepoResult<Vec<ShareLink>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SHARE_SELECT_SQL} WHERE note_id = ?1 ORDER BY created_at DESC, token ASC;"
        ))?;
        let mut rows = stmt.query([note_id])?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            links.push(raw_share(row)?);
        }
        Ok(links)
    }

    fn purge_expired(&self, now: Timestamp) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM note_shares WHERE expires_at IS NOT NULL AND expires_at <= ?1;",
            [now],
        )?;
        Ok(removed)
    }
}

fn raw_share(row: &Row<'_>) -> RepoResult<ShareLink> {
    let can_edit: i64 = row.get("can_edit")?;
    Ok(ShareLink {
        token: row.get("token")?,
        note_id: row.get("note_id")?,
        can_edit: int_to_bool(can_edit, "note_shares.can_edit")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        expires_at: row.get("expires_at")?,
    })
}
