//! Credential lifecycle.
//!
//! # Responsibility
//! - Hold the bearer token injected into every request.
//! - Persist it to a JSON file under the `notch_token` key.
//!
//! # Invariants
//! - `Session` clones share one token slot, so a clear through any clone
//!   is seen by all of them.
//! - `SessionStore` keeps unrelated keys already present in its file.

use log::info;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Key under which the token is persisted.
pub const TOKEN_KEY: &str = "notch_token";

/// Shared, explicitly injected credential holder.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.set(token);
        session
    }

    pub fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Stores `token`. Blank tokens clear the session.
    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        let value = (!token.trim().is_empty()).then_some(token);
        self.replace(value);
    }

    pub fn clear(&self) {
        self.replace(None);
    }

    fn replace(&self, value: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

/// Session file read/write failure.
#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "session file `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "session file `{}` is not a JSON object: {source}", path.display())
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// JSON file persisting the session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored token, or `None` when the file or key is missing.
    pub fn load(&self) -> Result<Option<String>, StoreError> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|token| !token.trim().is_empty()))
    }

    pub fn save(&self, token: &str) -> Result<(), StoreError> {
        let mut entries = self.read_entries()?;
        entries.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        self.write_entries(&entries)
    }

    /// Removes the token key. A missing file is not an error.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.read_entries()?;
        if entries.remove(TOKEN_KEY).is_none() {
            return Ok(());
        }
        self.write_entries(&entries)
    }

    /// Loads the stored token into `session`. Returns whether one was found.
    pub fn restore(&self, session: &Session) -> Result<bool, StoreError> {
        match self.load()? {
            Some(token) => {
                session.set(token);
                info!("event=session_restore module=client status=ok");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn read_entries(&self) -> Result<Map<String, Value>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&text).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = serde_json::to_string_pretty(entries).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, text).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, SessionStore, TOKEN_KEY};

    #[test]
    fn clones_share_the_token() {
        let session = Session::with_token("abc");
        let clone = session.clone();
        clone.clear();
        assert!(!session.is_authenticated());

        session.set("  ");
        assert_eq!(clone.token(), None);
    }

    #[test]
    fn store_round_trips_and_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("session.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let store = SessionStore::new(&path);
        assert_eq!(store.load().unwrap(), None);
        store.save("tok-1").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("tok-1"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw[TOKEN_KEY], "tok-1");

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn restore_fills_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let session = Session::new();
        assert!(!store.restore(&session).unwrap());

        store.save("tok-2").unwrap();
        assert!(store.restore(&session).unwrap());
        assert_eq!(session.token().as_deref(), Some("tok-2"));
    }
}
