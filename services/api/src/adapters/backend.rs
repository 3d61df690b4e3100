//! services/api/src/adapters/backend.rs
//!
//! This module contains the adapter for the companion backend's REST API.
//! It implements the `TripPeopleBackend` port from the `core` crate using `reqwest`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};
use trip_journal_core::domain::{NewTripPerson, Profile, Role, TripPerson};
use trip_journal_core::ports::{BackendIdentity, PortError, PortResult, TripPeopleBackend};

pub const AUTH_PROVIDER_HEADER: &str = "X-Auth-Provider";
pub const AUTH_UID_HEADER: &str = "X-Auth-UID";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `TripPeopleBackend` port over HTTP.
#[derive(Clone)]
pub struct HttpBackendAdapter {
    client: Client,
    base_url: String,
}

impl HttpBackendAdapter {
    /// Creates a new `HttpBackendAdapter`. `base_url` has no trailing slash.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn request(&self, method: Method, path: &str, identity: &BackendIdentity) -> RequestBuilder {
        self.client
            .request(method, format!("{}/api/v1{}", self.base_url, path))
            .header(AUTH_PROVIDER_HEADER, &identity.provider)
            .header(AUTH_UID_HEADER, &identity.uid)
    }
}

//=========================================================================================
// Response Envelopes
//=========================================================================================

#[derive(Deserialize)]
struct TripPersonList {
    #[serde(default)]
    trip_people: Vec<TripPerson>,
}

/// The backend answers single records either wrapped or bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum TripPersonEnvelope {
    Wrapped { trip_person: TripPerson },
    Bare(TripPerson),
}

impl TripPersonEnvelope {
    fn into_inner(self) -> TripPerson {
        match self {
            Self::Wrapped { trip_person } => trip_person,
            Self::Bare(person) => person,
        }
    }
}

#[derive(Deserialize)]
struct ProfileEnvelope {
    user: Profile,
}

#[derive(Deserialize)]
struct BackendErrorBody {
    error: Option<String>,
}

fn network_error(e: reqwest::Error) -> PortError {
    error!("Companion backend request failed: {:?}", e);
    PortError::Network(e.to_string())
}

/// Maps a non-success response onto a port error, keeping the backend's message.
async fn into_port_error(response: Response) -> PortError {
    let status = response.status();
    let message = response
        .json::<BackendErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::UNAUTHORIZED => PortError::Unauthorized,
        StatusCode::FORBIDDEN => PortError::Forbidden(message),
        StatusCode::NOT_FOUND => PortError::NotFound(message),
        StatusCode::CONFLICT => PortError::Conflict(message),
        _ => PortError::Unexpected(message),
    }
}

async fn read_json<T: DeserializeOwned>(request: RequestBuilder) -> PortResult<T> {
    let response = request.send().await.map_err(network_error)?;
    if !response.status().is_success() {
        return Err(into_port_error(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| PortError::Unexpected(format!("Malformed backend response: {}", e)))
}

//=========================================================================================
// `TripPeopleBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl TripPeopleBackend for HttpBackendAdapter {
    async fn list_trip_people(&self, identity: &BackendIdentity) -> PortResult<Vec<TripPerson>> {
        let list: TripPersonList =
            read_json(self.request(Method::GET, "/trip_people", identity)).await?;
        debug!("Fetched {} trip people.", list.trip_people.len());
        Ok(list.trip_people)
    }

    async fn get_trip_person(&self, identity: &BackendIdentity, id: i64) -> PortResult<TripPerson> {
        let path = format!("/trip_people/{}", id);
        let envelope: TripPersonEnvelope = read_json(self.request(Method::GET, &path, identity)).await?;
        Ok(envelope.into_inner())
    }

    async fn create_trip_person(
        &self,
        identity: &BackendIdentity,
        person: &NewTripPerson,
    ) -> PortResult<TripPerson> {
        let request = self.request(Method::POST, "/trip_people", identity).json(person);
        let envelope: TripPersonEnvelope = read_json(request).await?;
        Ok(envelope.into_inner())
    }

    async fn update_trip_person(
        &self,
        identity: &BackendIdentity,
        id: i64,
        person: &NewTripPerson,
    ) -> PortResult<TripPerson> {
        let path = format!("/trip_people/{}", id);
        let request = self
            .request(Method::PUT, &path, identity)
            .json(&json!({ "trip_person": person }));
        let envelope: TripPersonEnvelope = read_json(request).await?;
        Ok(envelope.into_inner())
    }

    async fn delete_trip_person(&self, identity: &BackendIdentity, id: i64) -> PortResult<()> {
        let path = format!("/trip_people/{}", id);
        let response = self
            .request(Method::DELETE, &path, identity)
            .send()
            .await
            .map_err(network_error)?;
        if !response.status().is_success() {
            return Err(into_port_error(response).await);
        }
        Ok(())
    }

    async fn get_profile(&self, identity: &BackendIdentity) -> PortResult<Profile> {
        let path = format!("/users/{}/{}", identity.provider, identity.uid);
        let envelope: ProfileEnvelope = read_json(self.request(Method::GET, &path, identity)).await?;
        Ok(envelope.user)
    }

    async fn update_profile(&self, identity: &BackendIdentity, name: &str) -> PortResult<Profile> {
        let path = format!("/users/{}/{}", identity.provider, identity.uid);
        let request = self
            .request(Method::PUT, &path, identity)
            .json(&json!({ "name": name }));
        let envelope: ProfileEnvelope = read_json(request).await?;
        debug!("Profile {} renamed", envelope.user.id);
        Ok(envelope.user)
    }

    async fn list_users(&self, identity: &BackendIdentity) -> PortResult<Value> {
        let request = self
            .request(Method::GET, "/admin/users", identity)
            .bearer_auth(&identity.uid);
        read_json(request).await
    }

    async fn update_user_role(
        &self,
        identity: &BackendIdentity,
        user_id: &str,
        role: Role,
    ) -> PortResult<Value> {
        let path = format!("/admin/users/{}/role", user_id);
        let request = self
            .request(Method::PATCH, &path, identity)
            .bearer_auth(&identity.uid)
            .json(&json!({ "role": role.as_str() }));
        read_json(request).await
    }
}
