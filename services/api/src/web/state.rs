//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-request session context.

use crate::adapters::session::DbSessionProvider;
use crate::config::Config;
use std::sync::Arc;
use trip_journal_core::domain::SessionSnapshot;
use trip_journal_core::ports::{BackendIdentity, DatabaseService, TripPeopleBackend};
use trip_journal_core::AuthUser;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub backend: Arc<dyn TripPeopleBackend>,
    pub config: Arc<Config>,
}

impl AppState {
    /// A session provider for the given login cookie value.
    pub fn session_provider(&self, session_id: Option<String>) -> DbSessionProvider {
        DbSessionProvider::new(self.db.clone(), session_id, self.config.session_ttl)
    }

    /// How the companion backend should see `user`.
    pub fn backend_identity(&self, user: &AuthUser) -> BackendIdentity {
        BackendIdentity {
            provider: self.config.auth_provider.clone(),
            uid: user.backend_uid().to_string(),
        }
    }
}

//=========================================================================================
// RequestSession (Specific to One Request)
//=========================================================================================

/// What the session middleware learned about the caller.
#[derive(Debug, Clone)]
pub struct RequestSession {
    pub session_id: Option<String>,
    pub snapshot: SessionSnapshot,
}
