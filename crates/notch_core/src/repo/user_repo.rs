//! User directory and session persistence.
//!
//! # Invariants
//! - Password hashes never leave this module except inside
//!   `UserCredentials` for verification.
//! - Session lookups ignore expired sessions.

use crate::model::resource::Timestamp;
use crate::model::user::User;
use crate::repo::resource_repo::{ensure_connection_ready, map_unique_violation, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Stored user plus password hash, used only for login verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Repository interface for users and sessions.
pub trait UserRepository {
    fn insert_user(&self, user: &User, password_hash: &str, now: Timestamp) -> RepoResult<()>;
    fn count_users(&self) -> RepoResult<u64>;
    fn get_user(&self, id: &str) -> RepoResult<Option<User>>;
    /// Case-insensitive handle lookup.
    fn find_credentials(&self, handle: &str) -> RepoResult<Option<UserCredentials>>;
    /// Directory listing ordered by handle.
    fn list_users(&self) -> RepoResult<Vec<User>>;
    fn insert_session(
        &self,
        token: &str,
        user_id: &str,
        now: Timestamp,
        expires_at: Option<Timestamp>,
    ) -> RepoResult<()>;
    /// Resolves a live session and records `now` as last seen.
    fn user_for_session(&self, token: &str, now: Timestamp) -> RepoResult<Option<User>>;
    fn delete_session(&self, token: &str) -> RepoResult<bool>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "users")?;
        ensure_connection_ready(conn, "sessions")?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn insert_user(&self, user: &User, password_hash: &str, now: Timestamp) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO users (id, handle, display_name, password_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5);",
                params![user.id, user.handle, user.display_name, password_hash, now],
            )
            .map_err(|err| map_unique_violation(err, "user", &user.handle))?;
        Ok(())
    }

    fn count_users(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn get_user(&self, id: &str) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, handle, display_name FROM users WHERE id = ?1;",
                [id],
                parse_user,
            )
            .optional()?;
        Ok(user)
    }

    fn find_credentials(&self, handle: &str) -> RepoResult<Option<UserCredentials>> {
        let credentials = self
            .conn
            .query_row(
                "SELECT id, handle, display_name, password_hash
                 FROM users
                 WHERE lower(handle) = lower(?1);",
                [handle.trim()],
                |row| {
                    Ok(UserCredentials {
                        user: parse_user(row)?,
                        password_hash: row.get("password_hash")?,
                    })
                },
            )
            .optional()?;
        Ok(credentials)
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, handle, display_name FROM users ORDER BY lower(handle) ASC;")?;
        let users = stmt
            .query_map([], parse_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn insert_session(
        &self,
        token: &str,
        user_id: &str,
        now: Timestamp,
        expires_at: Option<Timestamp>,
    ) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at, last_seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?3);",
                params![token, user_id, now, expires_at],
            )
            .map_err(|err| map_unique_violation(err, "session", "token"))?;
        Ok(())
    }

    fn user_for_session(&self, token: &str, now: Timestamp) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT u.id, u.handle, u.display_name
                 FROM sessions s
                 JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1
                   AND (s.expires_at IS NULL OR s.expires_at > ?2);",
                params![token, now],
                parse_user,
            )
            .optional()?;
        if user.is_some() {
            self.conn.execute(
                "UPDATE sessions SET last_seen_at = ?2 WHERE token = ?1;",
                params![token, now],
            )?;
        }
        Ok(user)
    }

    fn delete_session(&self, token: &str) -> RepoResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM sessions WHERE token = ?1;", [token])?;
        Ok(removed > 0)
    }
}

fn parse_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        handle: row.get("handle")?,
        display_name: row.get("display_name")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{SqliteUserRepository, UserRepository};
    use crate::db::open_db_in_memory;
    use crate::model::user::User;
    use crate::repo::resource_repo::RepoError;

    fn alice() -> User {
        User {
            id: "u-alice".to_string(),
            handle: "alice".to_string(),
            display_name: "Alice".to_string(),
        }
    }

    #[test]
    fn duplicate_handle_is_reported_as_existing() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteUserRepository::try_new(&conn).unwrap();
        repo.insert_user(&alice(), "hash", 1).unwrap();

        let mut again = alice();
        again.id = "u-other".to_string();
        let err = repo.insert_user(&again, "hash", 2).unwrap_err();
        assert!(matches!(err, RepoError::AlreadyExists { kind: "user", .. }));
    }

    #[test]
    fn expired_sessions_do_not_resolve() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteUserRepository::try_new(&conn).unwrap();
        repo.insert_user(&alice(), "hash", 1).unwrap();
        repo.insert_session("tok", "u-alice", 10, Some(100)).unwrap();

        assert_eq!(repo.user_for_session("tok", 50).unwrap(), Some(alice()));
        assert_eq!(repo.user_for_session("tok", 100).unwrap(), None);
        assert!(repo.delete_session("tok").unwrap());
        assert!(!repo.delete_session("tok").unwrap());
    }
}
