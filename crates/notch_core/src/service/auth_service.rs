//! Users, sessions and request authentication.
//!
//! # Responsibility
//! - Bootstrap the first user and create further users.
//! - Issue session tokens on login and resolve bearer credentials.
//!
//! # Invariants
//! - Handles are stored lowercased and validated against `HANDLE_RE`.
//! - Passwords and tokens are never logged.
//! - The service token resolves to `Principal::Service`, never to a user.

use crate::model::resource::{Timestamp, ValidationError};
use crate::model::user::{LoginRequest, NewUser, Principal, User};
use crate::repo::user_repo::UserRepository;
use crate::service::credentials::{constant_time_eq, generate_token, hash_password, verify_password};
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

static HANDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_.-]{0,31}$").expect("valid handle regex"));

const MS_PER_DAY: i64 = 86_400_000;

/// Issued session.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Auth service facade over a user repository.
pub struct AuthService<U> {
    users: U,
    session_days: i64,
    service_token: Option<String>,
}

impl<U: UserRepository> AuthService<U> {
    pub fn new(users: U) -> Self {
        Self {
            users,
            session_days: 30,
            service_token: None,
        }
    }

    /// Session lifetime in days. `0` means sessions never expire.
    pub fn with_session_days(mut self, days: i64) -> Self {
        self.session_days = days;
        self
    }

    pub fn with_service_token(mut self, token: Option<String>) -> Self {
        self.service_token = token.filter(|token| !token.trim().is_empty());
        self
    }

    /// Creates the first user. Fails with `Conflict` once any user exists.
    pub fn bootstrap(&self, payload: NewUser, now: Timestamp) -> ServiceResult<User> {
        if self.users.count_users()? > 0 {
            return Err(ServiceError::Conflict("Already bootstrapped".to_string()));
        }
        let user = self.create_user(payload, now)?;
        info!("event=bootstrap module=auth status=ok");
        Ok(user)
    }

    pub fn create_user(&self, payload: NewUser, now: Timestamp) -> ServiceResult<User> {
        let handle = normalize_handle(&payload.handle)?;
        let password = payload.password.trim();
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }
        let display_name = payload
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| handle.clone());

        let user = User {
            id: Uuid::new_v4().to_string(),
            handle,
            display_name,
        };
        self.users.insert_user(&user, &hash_password(password), now)?;
        Ok(user)
    }

    pub fn login(&self, request: LoginRequest, now: Timestamp) -> ServiceResult<Session> {
        let handle = request.handle.trim().to_lowercase();
        let password = request.password.trim();
        if handle.is_empty() {
            return Err(ValidationError::MissingField("handle").into());
        }
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }

        let credentials = match self.users.find_credentials(&handle)? {
            Some(credentials) if verify_password(password, &credentials.password_hash) => {
                credentials
            }
            _ => {
                warn!("event=login module=auth status=error reason=invalid_login");
                return Err(ServiceError::Auth("Invalid login"));
            }
        };

        let token = generate_token();
        let expires_at = (self.session_days > 0)
            .then(|| now.saturating_add(self.session_days.saturating_mul(MS_PER_DAY)));
        self.users
            .insert_session(&token, &credentials.user.id, now, expires_at)?;
        info!("event=login module=auth status=ok");
        Ok(Session {
            token,
            user: credentials.user,
        })
    }

    /// Ends a session. Unknown tokens are ignored.
    pub fn logout(&self, token: &str) -> ServiceResult<bool> {
        Ok(self.users.delete_session(token)?)
    }

    /// Resolves an `Authorization` header value to a principal.
    pub fn authenticate(
        &self,
        authorization: Option<&str>,
        now: Timestamp,
    ) -> ServiceResult<Principal> {
        let token = bearer_token(authorization)?;
        if let Some(service_token) = self.service_token.as_deref() {
            if constant_time_eq(token, service_token) {
                return Ok(Principal::Service);
            }
        }
        match self.users.user_for_session(token, now)? {
            Some(user) => Ok(Principal::User(user)),
            None => Err(ServiceError::Auth("Invalid session")),
        }
    }

    pub fn list_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.users.list_users()?)
    }
}

/// Extracts the token from `Bearer <token>`, scheme matched case-insensitively.
pub fn bearer_token(authorization: Option<&str>) -> ServiceResult<&str> {
    let header = authorization
        .map(str::trim)
        .filter(|header| !header.is_empty())
        .ok_or(ServiceError::Auth("Missing Authorization"))?;
    let (scheme, token) = header
        .split_once(char::is_whitespace)
        .ok_or(ServiceError::Auth("Invalid Authorization"))?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(ServiceError::Auth("Invalid Authorization"));
    }
    Ok(token)
}

fn normalize_handle(raw: &str) -> Result<String, ValidationError> {
    let handle = raw.trim().to_lowercase();
    if handle.is_empty() {
        return Err(ValidationError::MissingField("handle"));
    }
    if !HANDLE_RE.is_match(&handle) {
        return Err(ValidationError::Malformed(
            "handle may only contain a-z, 0-9, '_', '.', '-' (max 32)".to_string(),
        ));
    }
    Ok(handle)
}
