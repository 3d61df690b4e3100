//! services/api/src/web/middleware.rs
//!
//! Session middleware shared by every route.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use trip_journal_core::ports::SessionProvider;

use crate::web::state::{AppState, RequestSession};

pub const SESSION_COOKIE: &str = "session";

/// Reads the login session id from the `Cookie` header.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (name, value) = c.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
}

/// Middleware that resolves the session cookie into a `SessionSnapshot`.
///
/// It never rejects a request. Whether the caller may proceed is decided by
/// the guard in each handler, so an unauthenticated caller still gets a
/// redirect instruction rather than a bare 401.
pub async fn load_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    // 1. Extract the session id from the cookie
    let session_id = session_cookie(req.headers());

    // 2. Resolve it against the auth session table
    let snapshot = state.session_provider(session_id.clone()).snapshot().await;

    // 3. Insert the session into request extensions
    req.extensions_mut().insert(RequestSession {
        session_id,
        snapshot,
    });

    // 4. Continue to the handler
    next.run(req).await
}
