//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    auth::{AuthResponse, LoginRequest, SignupRequest},
    guard::{admin_guard, authorize, member_guard, GuardRejection},
    state::{AppState, RequestSession},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use trip_journal_core::domain::{Profile, Role, TripPerson};
use trip_journal_core::filter::{filter_trip_people, FilterSpec};
use trip_journal_core::ports::PortError;
use trip_journal_core::validation::{FieldErrors, ProfileForm, TripPersonForm, PROFILE_UPDATED};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::session_handler,
        list_trip_people_handler,
        create_trip_person_handler,
        get_trip_person_handler,
        update_trip_person_handler,
        delete_trip_person_handler,
        get_profile_handler,
        update_profile_handler,
        list_users_handler,
        update_user_role_handler,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            AuthResponse,
            TripPeopleList,
            ProfileResponse,
            RoleUpdateRequest
        )
    ),
    tags(
        (name = "Trip Journal API", description = "Accounts, companions and user administration for the travel journal.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A filtered and sorted companion list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TripPeopleList {
    #[schema(value_type = Vec<Object>)]
    pub trip_people: Vec<TripPerson>,
    pub total: usize,
    pub has_active_filters: bool,
}

impl TripPeopleList {
    /// Runs the filter pipeline over `people`.
    pub fn build(people: &[TripPerson], spec: &FilterSpec) -> Self {
        let trip_people: Vec<TripPerson> = filter_trip_people(people, spec)
            .into_iter()
            .cloned()
            .collect();
        Self {
            total: trip_people.len(),
            trip_people,
            has_active_filters: spec.has_active_filters(),
        }
    }
}

/// The caller's profile, with a confirmation after an update.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[schema(value_type = Object)]
    pub user: Profile,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleUpdateRequest {
    /// `general` or `admin`.
    pub role: String,
}

/// Every way a REST handler can fail.
#[derive(Debug)]
pub enum HandlerError {
    Guard(GuardRejection),
    Invalid(FieldErrors),
    Status(StatusCode, String),
}

impl From<GuardRejection> for HandlerError {
    fn from(rejection: GuardRejection) -> Self {
        Self::Guard(rejection)
    }
}

impl From<PortError> for HandlerError {
    fn from(e: PortError) -> Self {
        let status = match &e {
            PortError::NotFound(_) => StatusCode::NOT_FOUND,
            PortError::Unauthorized => StatusCode::UNAUTHORIZED,
            PortError::Forbidden(_) => StatusCode::FORBIDDEN,
            PortError::Network(_) => StatusCode::BAD_GATEWAY,
            PortError::Conflict(_) => StatusCode::CONFLICT,
            PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Companion backend call failed: {:?}", e);
        }
        Self::Status(status, e.to_string())
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            Self::Guard(rejection) => rejection.into_response(),
            Self::Invalid(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": errors }))).into_response()
            }
            Self::Status(status, message) => (status, message).into_response(),
        }
    }
}

//=========================================================================================
// Companion Handlers
//=========================================================================================

/// List the caller's companions, filtered and sorted.
#[utoipa::path(
    get,
    path = "/trip_people",
    params(
        ("search" = Option<String>, Query, description = "Case-insensitive text matched against name, likes, dislikes, address and memo."),
        ("relationship_id" = Option<String>, Query, description = "Relationship id; empty for all."),
        ("sort_by" = Option<String>, Query, description = "One of name, created_at, birthday, relationship."),
        ("sort_order" = Option<String>, Query, description = "asc or desc (default desc).")
    ),
    responses(
        (status = 200, description = "The filtered companion list", body = TripPeopleList),
        (status = 401, description = "Not signed in; the body names the login redirect"),
        (status = 403, description = "Signed in without a member role"),
        (status = 502, description = "The companion backend is unreachable")
    )
)]
pub async fn list_trip_people_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<RequestSession>,
    Query(spec): Query<FilterSpec>,
) -> Result<impl IntoResponse, HandlerError> {
    // 1. Guard the page
    let user = authorize(&session.snapshot, member_guard())?;

    // 2. Fetch the companions from the backend
    let identity = app_state.backend_identity(&user);
    let people = app_state.backend.list_trip_people(&identity).await?;

    // 3. Filter and sort
    Ok(Json(TripPeopleList::build(&people, &spec)))
}

/// Register a new companion.
#[utoipa::path(
    post,
    path = "/trip_people",
    request_body(content = Object, description = "Companion form: name, relationship_id, birthday, likes, dislikes, address, memo."),
    responses(
        (status = 201, description = "Companion created"),
        (status = 422, description = "Validation failed; `errors` maps fields to messages")
    )
)]
pub async fn create_trip_person_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<RequestSession>,
    Json(form): Json<TripPersonForm>,
) -> Result<impl IntoResponse, HandlerError> {
    // 1. Guard the page
    let user = authorize(&session.snapshot, member_guard())?;

    // 2. Validate the form
    let new_person = form.into_new_trip_person().map_err(HandlerError::Invalid)?;

    // 3. Create it in the backend
    let identity = app_state.backend_identity(&user);
    let created = app_state
        .backend
        .create_trip_person(&identity, &new_person)
        .await?;
    info!("Created trip person {}", created.id);

    Ok((StatusCode::CREATED, Json(created)))
}

/// Fetch one companion.
#[utoipa::path(
    get,
    path = "/trip_people/{id}",
    params(("id" = i64, Path, description = "Companion id")),
    responses(
        (status = 200, description = "The companion"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_trip_person_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<RequestSession>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = authorize(&session.snapshot, member_guard())?;
    let identity = app_state.backend_identity(&user);
    let person = app_state.backend.get_trip_person(&identity, id).await?;
    Ok(Json(person))
}

/// Update a companion from the edit form.
#[utoipa::path(
    patch,
    path = "/trip_people/{id}",
    params(("id" = i64, Path, description = "Companion id")),
    request_body(content = Object, description = "Companion form: name, relationship_id, birthday, likes, dislikes, address, memo."),
    responses(
        (status = 200, description = "The updated companion"),
        (status = 404, description = "Not found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_trip_person_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<RequestSession>,
    Path(id): Path<i64>,
    Json(form): Json<TripPersonForm>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = authorize(&session.snapshot, member_guard())?;
    let changes = form.into_new_trip_person().map_err(HandlerError::Invalid)?;
    let identity = app_state.backend_identity(&user);
    let updated = app_state
        .backend
        .update_trip_person(&identity, id, &changes)
        .await?;
    Ok(Json(updated))
}

/// Delete a companion.
#[utoipa::path(
    delete,
    path = "/trip_people/{id}",
    params(("id" = i64, Path, description = "Companion id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_trip_person_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<RequestSession>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = authorize(&session.snapshot, member_guard())?;
    let identity = app_state.backend_identity(&user);
    app_state.backend.delete_trip_person(&identity, id).await?;
    info!("Deleted trip person {}", id);
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Profile Handlers
//=========================================================================================

/// The caller's own profile.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_profile_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<RequestSession>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = authorize(&session.snapshot, member_guard())?;
    let identity = app_state.backend_identity(&user);
    let profile = app_state.backend.get_profile(&identity).await?;
    Ok(Json(ProfileResponse {
        message: None,
        user: profile,
    }))
}

/// Rename the caller. The name is trimmed and limited to 20 characters.
#[utoipa::path(
    put,
    path = "/me",
    request_body(content = Object, description = "`{name}`"),
    responses(
        (status = 200, description = "The updated profile", body = ProfileResponse),
        (status = 401, description = "Not signed in"),
        (status = 422, description = "Blank or overlong name")
    )
)]
pub async fn update_profile_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<RequestSession>,
    Json(form): Json<ProfileForm>,
) -> Result<impl IntoResponse, HandlerError> {
    // 1. Guard the page
    let user = authorize(&session.snapshot, member_guard())?;

    // 2. Validate the name
    let name = form.into_name().map_err(HandlerError::Invalid)?;

    // 3. Forward to the backend
    let identity = app_state.backend_identity(&user);
    let profile = app_state.backend.update_profile(&identity, &name).await?;
    info!("Profile {} updated", profile.id);
    Ok(Json(ProfileResponse {
        message: Some(PROFILE_UPDATED.to_string()),
        user: profile,
    }))
}

//=========================================================================================
// Admin Handlers
//=========================================================================================

/// List every user (admin only).
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "The backend's user list"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_users_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<RequestSession>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = authorize(&session.snapshot, admin_guard())?;
    let identity = app_state.backend_identity(&user);
    let users = app_state.backend.list_users(&identity).await?;
    Ok(Json(users))
}

/// Change a user's role (admin only).
#[utoipa::path(
    patch,
    path = "/admin/users/{id}/role",
    params(("id" = String, Path, description = "Backend user id")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "The updated user"),
        (status = 400, description = "Role is not general or admin"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn update_user_role_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<RequestSession>,
    Path(user_id): Path<String>,
    Json(req): Json<RoleUpdateRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    // 1. Guard the page
    let user = authorize(&session.snapshot, admin_guard())?;

    // 2. Only general and admin may be assigned
    let role = match req.role.parse::<Role>() {
        Ok(role @ (Role::General | Role::Admin)) => role,
        _ => {
            return Err(HandlerError::Status(
                StatusCode::BAD_REQUEST,
                "Invalid role. Must be 'general' or 'admin'".to_string(),
            ))
        }
    };

    // 3. Forward to the backend
    let identity = app_state.backend_identity(&user);
    let updated = app_state
        .backend
        .update_user_role(&identity, &user_id, role)
        .await?;
    info!("User {} is now {}", user_id, role);
    Ok(Json(updated))
}
