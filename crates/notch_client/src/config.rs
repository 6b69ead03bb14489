//! Client configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the client talks to and where it keeps its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Scheme and host of the authority. Unused by the local transport.
    pub base_url: String,
    pub api_base_path: String,
    /// Optional file persisting the session token.
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_base_path: "/api".to_string(),
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Reads `NOTCH_BASE_URL`, `NOTCH_API_BASE_PATH` and `NOTCH_SESSION_FILE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };
        let mut config = Self::default();
        if let Some(raw) = value("NOTCH_BASE_URL") {
            config.base_url = raw;
        }
        if let Some(raw) = value("NOTCH_API_BASE_PATH") {
            config.api_base_path = raw;
        }
        if let Some(raw) = value("NOTCH_SESSION_FILE") {
            config.session_file = Some(PathBuf::from(raw));
        }
        config
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
}

#[cfg(test)]
mod tests {
    use super::ClientConfig;

    #[test]
    fn env_overrides_defaults() {
        let config = ClientConfig::from_lookup(|key| match key {
            "NOTCH_API_BASE_PATH" => Some("v1/".to_string()),
            "NOTCH_SESSION_FILE" => Some(" ".to_string()),
            _ => None,
        });
        assert_eq!(config.normalized_base_path(), "/v1");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.session_file, None);
    }
}
