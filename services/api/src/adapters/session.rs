//! services/api/src/adapters/session.rs
//!
//! The session provider backed by the auth session table. It implements the
//! `SessionProvider` port for one login cookie.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use trip_journal_core::domain::SessionSnapshot;
use trip_journal_core::ports::{DatabaseService, PortError, PortResult, SessionProvider};

/// Reads and slides one auth session. A provider without a session id is
/// permanently unauthenticated.
#[derive(Clone)]
pub struct DbSessionProvider {
    db: Arc<dyn DatabaseService>,
    session_id: Option<String>,
    ttl: chrono::Duration,
}

impl DbSessionProvider {
    pub fn new(db: Arc<dyn DatabaseService>, session_id: Option<String>, ttl: chrono::Duration) -> Self {
        Self { db, session_id, ttl }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

#[async_trait]
impl SessionProvider for DbSessionProvider {
    async fn snapshot(&self) -> SessionSnapshot {
        let Some(session_id) = self.session_id.as_deref() else {
            return SessionSnapshot::Unauthenticated;
        };

        let user_id = match self.db.validate_auth_session(session_id).await {
            Ok(user_id) => user_id,
            Err(PortError::Unauthorized) => {
                debug!("Auth session is missing or expired.");
                return SessionSnapshot::Unauthenticated;
            }
            Err(e) => {
                warn!("Failed to validate auth session: {:?}", e);
                return SessionSnapshot::Unauthenticated;
            }
        };

        match self.db.get_user_by_id(user_id).await {
            Ok(user) => SessionSnapshot::Authenticated(user.to_session_user()),
            Err(e) => {
                warn!("Failed to load the session user {}: {:?}", user_id, e);
                SessionSnapshot::Unauthenticated
            }
        }
    }

    async fn refresh(&self) -> PortResult<()> {
        let session_id = self.session_id.as_deref().ok_or(PortError::Unauthorized)?;
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| PortError::Unexpected(format!("Session lifetime {} is out of range", self.ttl)))?;
        self.db.touch_auth_session(session_id, expires_at).await
    }
}
