//! crates/trip_journal_core/src/auth.rs
//!
//! The authentication error value handed to guard callbacks and clients.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::domain::Role;

pub const FORBIDDEN_ROLE_MESSAGE: &str = "必要な権限がありません";
pub const EMAIL_UNVERIFIED_MESSAGE: &str = "メールアドレスの認証が必要です";
pub const SESSION_REFRESH_MESSAGE: &str = "セッションの更新に失敗しました";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorKind {
    Unauthorized,
    Forbidden,
    SessionExpired,
    InvalidCredentials,
    NetworkError,
    #[serde(rename = "UNKNOWN_ERROR")]
    Unknown,
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::SessionExpired => "session expired",
            Self::InvalidCredentials => "invalid credentials",
            Self::NetworkError => "network error",
            Self::Unknown => "unknown error",
        };
        f.write_str(name)
    }
}

/// An immutable description of an authentication or authorization failure.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{kind} ({status}): {message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
    pub status: u16,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, Value>>,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>, status: u16) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
            occurred_at: Utc::now(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: &str, value: Value) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value);
        self
    }

    /// The session's role is not one of the roles the page accepts.
    pub fn missing_role(required: &HashSet<Role>, user_role: Role) -> Self {
        let mut required: Vec<u8> = required.iter().copied().map(u8::from).collect();
        required.sort_unstable();
        Self::new(AuthErrorKind::Forbidden, FORBIDDEN_ROLE_MESSAGE, 403)
            .with_detail("required_role", json!(required))
            .with_detail("user_role", json!(u8::from(user_role)))
    }

    pub fn email_unverified() -> Self {
        Self::new(AuthErrorKind::Forbidden, EMAIL_UNVERIFIED_MESSAGE, 403)
    }

    pub fn session_refresh_failed(cause: &str) -> Self {
        Self::new(AuthErrorKind::SessionExpired, SESSION_REFRESH_MESSAGE, 401)
            .with_detail("error", json!(cause))
    }
}
