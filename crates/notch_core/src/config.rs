//! Authority configuration.
//!
//! Loaded from an optional JSON file named by `NOTCH_CONFIG`, then overridden
//! by individual `NOTCH_*` environment variables. Blank values are ignored.

use crate::service::ListLimits;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Environment variable naming a JSON config file.
pub const CONFIG_FILE_ENV: &str = "NOTCH_CONFIG";

/// Authority settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Route prefix, e.g. `/api`.
    pub api_base_path: String,
    /// Public app URL used to build share links.
    pub app_base_url: String,
    pub db_path: PathBuf,
    /// Session lifetime; `0` disables expiry.
    pub session_days: i64,
    /// Integration token resolving to the service principal.
    pub service_token: Option<String>,
    pub list_limit_default: u32,
    pub list_limit_max: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            api_base_path: "/api".to_string(),
            app_base_url: "http://localhost:8080".to_string(),
            db_path: std::env::temp_dir().join("notch.sqlite3"),
            session_days: 30,
            service_token: None,
            list_limit_default: 200,
            list_limit_max: 500,
        }
    }
}

impl CoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps variable names to values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let mut config = match value(CONFIG_FILE_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(raw) = value("NOTCH_API_BASE_PATH") {
            config.api_base_path = raw;
        }
        if let Some(raw) = value("NOTCH_APP_BASE_URL") {
            config.app_base_url = raw;
        }
        if let Some(raw) = value("NOTCH_DB_PATH") {
            config.db_path = PathBuf::from(raw);
        }
        if let Some(raw) = value("NOTCH_SESSION_DAYS") {
            config.session_days = parse_number("NOTCH_SESSION_DAYS", &raw)?;
        }
        if let Some(raw) = value("NOTCH_SERVICE_TOKEN") {
            config.service_token = Some(raw);
        }
        if let Some(raw) = value("NOTCH_LIST_LIMIT_DEFAULT") {
            config.list_limit_default = parse_number("NOTCH_LIST_LIMIT_DEFAULT", &raw)?;
        }
        if let Some(raw) = value("NOTCH_LIST_LIMIT_MAX") {
            config.list_limit_max = parse_number("NOTCH_LIST_LIMIT_MAX", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file. Missing keys take defaults.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn list_limits(&self) -> ListLimits {
        ListLimits {
            default: self.list_limit_default,
            max: self.list_limit_max,
        }
    }

    /// Route prefix without a trailing slash (`""` for root).
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.api_base_path.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.list_limit_default == 0 {
            return Err(ConfigError::InvalidValue {
                key: "list_limit_default",
                value: "0".to_string(),
            });
        }
        if self.list_limit_max < self.list_limit_default {
            return Err(ConfigError::InvalidValue {
                key: "list_limit_max",
                value: self.list_limit_max.to_string(),
            });
        }
        if self.session_days < 0 {
            return Err(ConfigError::InvalidValue {
                key: "session_days",
                value: self.session_days.to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration loading failure.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidValue {
        key: &'static str,
        value: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidValue { .. } => None,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
