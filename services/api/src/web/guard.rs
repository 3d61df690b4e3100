//! services/api/src/web/guard.rs
//!
//! Applies the core `AuthGuard` to single HTTP requests. A request is one
//! evaluation of a fresh guard, so any failure always carries its redirect.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use trip_journal_core::auth::AuthError;
use trip_journal_core::domain::{AuthUser, Role, SessionSnapshot};
use trip_journal_core::guard::{AuthGuard, GuardConfig, GuardState, GuardUi, RedirectReason};

/// Guard for companion pages: any signed-in general user or admin.
pub fn member_guard() -> GuardConfig {
    GuardConfig::default().require_any_role([Role::General, Role::Admin])
}

/// Guard for the user administration pages.
pub fn admin_guard() -> GuardConfig {
    GuardConfig::default().require_role(Role::Admin)
}

/// The body returned when the guard turns a request away.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardRejection {
    #[serde(skip)]
    pub state: GuardState,
    pub redirect_to: Option<String>,
    pub reason: Option<RedirectReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AuthError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui: Option<GuardUi>,
}

impl GuardRejection {
    pub fn status(&self) -> StatusCode {
        match self.state {
            GuardState::Unauthenticated => StatusCode::UNAUTHORIZED,
            GuardState::AuthenticatedNoRole | GuardState::AuthenticatedUnverified => {
                StatusCode::FORBIDDEN
            }
            GuardState::Loading | GuardState::AuthenticatedOk => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Runs one guard evaluation for a request and yields the admitted user.
pub fn authorize(snapshot: &SessionSnapshot, config: GuardConfig) -> Result<AuthUser, GuardRejection> {
    let mut guard = AuthGuard::new(config.auto_refresh(false));
    let decision = guard.evaluate(snapshot);

    if decision.check_access() {
        if let Some(user) = decision.user() {
            return Ok(user.clone());
        }
    }

    let (redirect_to, reason) = match decision.redirect {
        Some(redirect) => (Some(redirect.to), Some(redirect.reason)),
        None => (None, None),
    };
    Err(GuardRejection {
        state: decision.assessment.state,
        redirect_to,
        reason,
        error: decision.assessment.error,
        ui: decision.ui,
    })
}
