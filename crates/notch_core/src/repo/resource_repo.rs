//! Generic versioned-resource repository over SQLite.
//!
//! # Responsibility
//! - Provide insert/get/list/versioned-update for every resource table.
//! - Own visibility, soft-delete filtering, text search and paging SQL.
//! - Provide container helpers (default lookup, delete with reassignment).
//!
//! # Invariants
//! - Write paths call `Versioned::validate()` before SQL mutations.
//! - `update_versioned` is a compare-and-swap on `version`: a stale writer
//!   never overwrites a newer row.
//! - Listing only returns rows owned by or shared with the viewer.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::resource::{ResourceId, ResourceMeta, Timestamp, UserId, ValidationError, Versioned};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

const META_COLUMNS: &[&str] = &[
    "id",
    "created_by",
    "shared_with",
    "created_at",
    "updated_at",
    "version",
];

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound {
        kind: &'static str,
        id: String,
    },
    /// Stored version moved on since the caller read the row.
    VersionConflict {
        kind: &'static str,
        id: String,
        expected: i64,
        actual: i64,
    },
    /// Unique key already taken.
    AlreadyExists {
        kind: &'static str,
        key: String,
    },
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::VersionConflict {
                kind,
                id,
                expected,
                actual,
            } => write!(
                f,
                "version conflict on {kind} {id}: expected {expected}, stored {actual}"
            ),
            Self::AlreadyExists { kind, key } => write!(f, "{kind} already exists: {key}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Table mapping for a versioned resource type.
pub trait ResourceRecord: Versioned + Sized {
    /// Singular name used in errors and logs.
    const KIND: &'static str;
    const TABLE: &'static str;
    /// Type-specific columns, in `column_values` order.
    const COLUMNS: &'static [&'static str];
    /// Whether rows carry a `deleted_at` marker.
    const SOFT_DELETE: bool;
    /// Container reference column used for scoped listing.
    const SCOPE_COLUMN: Option<&'static str>;
    /// Columns matched by free-text query.
    const SEARCH_COLUMNS: &'static [&'static str];
    const ORDER_BY: &'static str;

    fn column_values(&self) -> Vec<Value>;
    fn from_row(meta: ResourceMeta, row: &Row<'_>) -> RepoResult<Self>;
}

/// Container type whose members reference it through `MEMBER_COLUMN`.
pub trait ContainerRecord: ResourceRecord {
    const MEMBER_TABLE: &'static str;
    const MEMBER_COLUMN: &'static str;

    /// Whether this row carries the `is_default` flag.
    fn is_default(&self) -> bool;
    /// Fresh default container for `owner`.
    fn default_for(owner: &str, now: Timestamp) -> Result<Self, ValidationError>;
}

/// Listing options for one resource table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceListQuery {
    /// Only rows owned by or shared with this user are returned.
    pub viewer: UserId,
    pub scope: Option<ResourceId>,
    pub include_deleted: bool,
    /// Implies `include_deleted`.
    pub deleted_only: bool,
    /// Case-insensitive substring match over `SEARCH_COLUMNS`.
    pub text: Option<String>,
    /// Extra static SQL predicates (no bind parameters).
    pub conditions: Vec<&'static str>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl ResourceListQuery {
    pub fn for_viewer(viewer: impl Into<UserId>) -> Self {
        Self {
            viewer: viewer.into(),
            ..Self::default()
        }
    }
}

/// Repository interface shared by every resource type.
pub trait ResourceRepository<T: ResourceRecord> {
    fn insert(&self, record: &T) -> RepoResult<()>;
    /// Loads one row by id regardless of visibility or deletion state.
    fn get(&self, id: &str) -> RepoResult<Option<T>>;
    fn list(&self, query: &ResourceListQuery) -> RepoResult<Vec<T>>;
    /// Persists `record` only if the stored version is `expected_version`.
    fn update_versioned(&self, record: &T, expected_version: i64) -> RepoResult<()>;
}

/// Container-specific persistence operations.
pub trait ContainerRepository<T: ContainerRecord>: ResourceRepository<T> {
    /// The container flagged `is_default` for `owner`, if provisioned.
    fn find_default(&self, owner: &str) -> RepoResult<Option<T>>;
    /// Moves every member to `target_id`, then deletes the container.
    ///
    /// Runs in one transaction and returns the number of moved members.
    fn delete_and_reassign(
        &self,
        container_id: &str,
        target_id: &str,
        now: Timestamp,
    ) -> RepoResult<usize>;
}

/// SQLite-backed repository for resource type `T`.
#[derive(Debug)]
pub struct SqliteResourceRepository<'conn, T> {
    conn: &'conn Connection,
    _record: PhantomData<fn() -> T>,
}

impl<'conn, T: ResourceRecord> SqliteResourceRepository<'conn, T> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, T::TABLE)?;
        Ok(Self {
            conn,
            _record: PhantomData,
        })
    }

    pub(crate) fn connection(&self) -> &'conn Connection {
        self.conn
    }

    fn stored_version(&self, id: &str) -> RepoResult<Option<i64>> {
        let version = self
            .conn
            .query_row(
                &format!("SELECT version FROM {} WHERE id = ?1;", T::TABLE),
                [id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }
}

impl<T: ResourceRecord> ResourceRepository<T> for SqliteResourceRepository<'_, T> {
    fn insert(&self, record: &T) -> RepoResult<()> {
        record.validate()?;

        let columns = all_columns::<T>();
        let placeholders = (1..=columns.len())
            .map(|idx| format!("?{idx}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            T::TABLE,
            columns.join(", ")
        );

        let mut values = meta_values(record.meta())?;
        values.extend(record.column_values());
        self.conn
            .execute(&sql, params_from_iter(values))
            .map_err(|err| map_unique_violation(err, T::KIND, &record.meta().id))?;
        Ok(())
    }

    fn get(&self, id: &str) -> RepoResult<Option<T>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE id = ?1;", select_sql::<T>()))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_record(row)?));
        }
        Ok(None)
    }

    fn list(&self, query: &ResourceListQuery) -> RepoResult<Vec<T>> {
        let mut sql = format!(
            "{} WHERE (created_by = ? OR EXISTS (
                SELECT 1 FROM json_each({table}.shared_with) WHERE json_each.value = ?
            ))",
            select_sql::<T>(),
            table = T::TABLE
        );
        let mut bind_values = vec![
            Value::Text(query.viewer.clone()),
            Value::Text(query.viewer.clone()),
        ];

        if T::SOFT_DELETE {
            if query.deleted_only {
                sql.push_str(" AND deleted_at IS NOT NULL");
            } else if !query.include_deleted {
                sql.push_str(" AND deleted_at IS NULL");
            }
        }

        if let (Some(column), Some(scope)) = (T::SCOPE_COLUMN, query.scope.as_ref()) {
            sql.push_str(&format!(" AND {column} = ?"));
            bind_values.push(Value::Text(scope.clone()));
        }

        let text = query
            .text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());
        if let Some(text) = text.filter(|_| !T::SEARCH_COLUMNS.is_empty()) {
            let pattern = format!("%{}%", escape_like(&text.to_lowercase()));
            let clauses = T::SEARCH_COLUMNS
                .iter()
                .map(|column| format!("lower({column}) LIKE ? ESCAPE '\\'"))
                .collect::<Vec<_>>()
                .join(" OR ");
            sql.push_str(&format!(" AND ({clauses})"));
            for _ in T::SEARCH_COLUMNS {
                bind_values.push(Value::Text(pattern.clone()));
            }
        }

        for condition in &query.conditions {
            sql.push_str(" AND ");
            sql.push_str(condition);
        }

        sql.push_str(" ORDER BY ");
        sql.push_str(T::ORDER_BY);

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record(row)?);
        }
        Ok(records)
    }

    fn update_versioned(&self, record: &T, expected_version: i64) -> RepoResult<()> {
        record.validate()?;

        let meta = record.meta();
        let mut assignments = vec![
            "shared_with = ?1".to_string(),
            "updated_at = ?2".to_string(),
            "version = ?3".to_string(),
        ];
        for (offset, column) in T::COLUMNS.iter().enumerate() {
            assignments.push(format!("{column} = ?{}", offset + 4));
        }
        let id_slot = T::COLUMNS.len() + 4;
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{id_slot} AND version = ?{};",
            T::TABLE,
            assignments.join(", "),
            id_slot + 1
        );

        let mut values = vec![
            Value::Text(shared_with_to_db(&meta.shared_with)?),
            Value::Integer(meta.updated_at),
            Value::Integer(meta.version),
        ];
        values.extend(record.column_values());
        values.push(Value::Text(meta.id.clone()));
        values.push(Value::Integer(expected_version));

        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        if changed == 1 {
            return Ok(());
        }

        match self.stored_version(&meta.id)? {
            None => Err(RepoError::NotFound {
                kind: T::KIND,
                id: meta.id.clone(),
            }),
            Some(actual) => Err(RepoError::VersionConflict {
                kind: T::KIND,
                id: meta.id.clone(),
                expected: expected_version,
                actual,
            }),
        }
    }
}

impl<T: ContainerRecord> ContainerRepository<T> for SqliteResourceRepository<'_, T> {
    fn find_default(&self, owner: &str) -> RepoResult<Option<T>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE created_by = ?1 AND is_default = 1 LIMIT 1;",
            select_sql::<T>()
        ))?;
        let mut rows = stmt.query([owner])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_record(row)?));
        }
        Ok(None)
    }

    fn delete_and_reassign(
        &self,
        container_id: &str,
        target_id: &str,
        now: Timestamp,
    ) -> RepoResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let moved = tx.execute(
            &format!(
                "UPDATE {table}
                 SET {column} = ?1,
                     version = version + 1,
                     updated_at = MAX(?2, updated_at + 1)
                 WHERE {column} = ?3;",
                table = T::MEMBER_TABLE,
                column = T::MEMBER_COLUMN
            ),
            params![target_id, now, container_id],
        )?;
        let deleted = tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", T::TABLE),
            [container_id],
        )?;
        if deleted == 0 {
            return Err(RepoError::NotFound {
                kind: T::KIND,
                id: container_id.to_string(),
            });
        }
        tx.commit()?;
        Ok(moved)
    }
}

pub(crate) fn select_sql<T: ResourceRecord>() -> String {
    format!("SELECT {} FROM {}", all_columns::<T>().join(", "), T::TABLE)
}

pub(crate) fn parse_record<T: ResourceRecord>(row: &Row<'_>) -> RepoResult<T> {
    let shared_with_text: String = row.get("shared_with")?;
    let meta = ResourceMeta {
        id: row.get("id")?,
        created_by: row.get("created_by")?,
        shared_with: parse_shared_with(&shared_with_text, T::TABLE)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        version: row.get("version")?,
    };
    T::from_row(meta, row)
}

fn all_columns<T: ResourceRecord>() -> Vec<&'static str> {
    META_COLUMNS
        .iter()
        .chain(T::COLUMNS.iter())
        .copied()
        .collect()
}

fn meta_values(meta: &ResourceMeta) -> RepoResult<Vec<Value>> {
    Ok(vec![
        Value::Text(meta.id.clone()),
        Value::Text(meta.created_by.clone()),
        Value::Text(shared_with_to_db(&meta.shared_with)?),
        Value::Integer(meta.created_at),
        Value::Integer(meta.updated_at),
        Value::Integer(meta.version),
    ])
}

fn shared_with_to_db(users: &[UserId]) -> RepoResult<String> {
    serde_json::to_string(users)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode shared_with: {err}")))
}

fn parse_shared_with(value: &str, table: &str) -> RepoResult<Vec<UserId>> {
    serde_json::from_str(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid shared_with value in {table}.shared_with"))
    })
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub(crate) fn map_unique_violation(err: rusqlite::Error, kind: &'static str, key: &str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ErrorCode::ConstraintViolation
                && matches!(
                    code.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                ) =>
        {
            RepoError::AlreadyExists {
                kind,
                key: key.to_string(),
            }
        }
        _ => RepoError::from(err),
    }
}

pub(crate) fn opt_int(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

pub(crate) fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

/// Rejects connections that are not migrated to the latest schema.
pub(crate) fn ensure_connection_ready(conn: &Connection, table: &'static str) -> RepoResult<()> {
    let actual_version = current_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::MissingRequiredTable(table));
    }
    Ok(())
}
