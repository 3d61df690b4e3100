//! crates/trip_journal_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{
    NewTripPerson, Profile, Role, SessionSnapshot, TripPerson, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Accounts and login sessions for email/password authentication.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user id of an unexpired session.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    /// Moves the expiry of an unexpired session.
    async fn touch_auth_session(
        &self,
        session_id: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    /// Deletes every expired session and returns how many were removed.
    async fn purge_expired_auth_sessions(&self) -> PortResult<u64>;
}

/// The source of session state for a guarded view.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Reads the current session state.
    async fn snapshot(&self) -> SessionSnapshot;

    /// Asks the provider to extend or re-read the session.
    async fn refresh(&self) -> PortResult<()>;
}

/// How the companion backend identifies the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendIdentity {
    pub provider: String,
    pub uid: String,
}

/// The companion backend. Owns persistence of trip people and role assignment.
#[async_trait]
pub trait TripPeopleBackend: Send + Sync {
    async fn list_trip_people(&self, identity: &BackendIdentity) -> PortResult<Vec<TripPerson>>;

    async fn get_trip_person(&self, identity: &BackendIdentity, id: i64) -> PortResult<TripPerson>;

    async fn create_trip_person(
        &self,
        identity: &BackendIdentity,
        person: &NewTripPerson,
    ) -> PortResult<TripPerson>;

    async fn update_trip_person(
        &self,
        identity: &BackendIdentity,
        id: i64,
        person: &NewTripPerson,
    ) -> PortResult<TripPerson>;

    async fn delete_trip_person(&self, identity: &BackendIdentity, id: i64) -> PortResult<()>;

    // --- Profile ---
    async fn get_profile(&self, identity: &BackendIdentity) -> PortResult<Profile>;

    /// Renames the caller. `name` is already trimmed and validated.
    async fn update_profile(&self, identity: &BackendIdentity, name: &str) -> PortResult<Profile>;

    // --- Admin ---
    async fn list_users(&self, identity: &BackendIdentity) -> PortResult<Value>;

    async fn update_user_role(
        &self,
        identity: &BackendIdentity,
        user_id: &str,
        role: Role,
    ) -> PortResult<Value>;
}
