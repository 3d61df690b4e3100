//! In-memory port fakes shared by the api integration tests.

#![allow(dead_code)]

use api_lib::config::Config;
use api_lib::web::state::{AppState, RequestSession};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use trip_journal_core::domain::{
    NewTripPerson, Profile, Role, SessionSnapshot, SessionUser, TripPerson, User,
    UserCredentials,
};
use trip_journal_core::ports::{
    BackendIdentity, DatabaseService, PortError, PortResult, SessionProvider, TripPeopleBackend,
};
use uuid::Uuid;

//=========================================================================================
// Records
//=========================================================================================

pub fn person(id: i64, name: &str, relationship_id: i64) -> TripPerson {
    TripPerson {
        id,
        name: name.to_string(),
        relationship_id,
        relationship_name: None,
        birthday: None,
        age: None,
        display_age: None,
        likes: None,
        dislikes: None,
        address: None,
        memo: None,
        user_id: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn companions() -> Vec<TripPerson> {
    let mut kyoto = person(1, "たなか", 1);
    kyoto.address = Some("京都府".to_string());
    let mut onsen = person(2, "さとう", 2);
    onsen.likes = Some("温泉".to_string());
    let mut ramen = person(3, "Suzuki", 2);
    ramen.memo = Some("ラーメン好き".to_string());
    vec![kyoto, onsen, ramen, person(4, "いとう", 3)]
}

pub fn signed_in(role: Option<Role>) -> SessionSnapshot {
    SessionSnapshot::Authenticated(SessionUser {
        id: "42".to_string(),
        name: Some("Hanako".to_string()),
        email: Some("hanako@example.com".to_string()),
        image: None,
        role,
        email_verified: Some(Utc::now()),
    })
}

pub fn request_session(snapshot: SessionSnapshot) -> RequestSession {
    RequestSession {
        session_id: Some("cookie".to_string()),
        snapshot,
    }
}

//=========================================================================================
// DatabaseService
//=========================================================================================

#[derive(Default)]
pub struct FakeDb {
    pub users: Mutex<HashMap<Uuid, (User, String)>>,
    pub sessions: Mutex<HashMap<String, (Uuid, DateTime<Utc>)>>,
}

impl FakeDb {
    pub fn with_user(role: Role) -> (Arc<Self>, Uuid) {
        let db = Arc::new(Self::default());
        let user_id = Uuid::new_v4();
        let user = User {
            user_id,
            email: "hanako@example.com".to_string(),
            name: None,
            role,
            email_verified_at: None,
        };
        db.users
            .lock()
            .expect("lock")
            .insert(user_id, (user, "hash".to_string()));
        (db, user_id)
    }

    pub fn expires_at(&self, session_id: &str) -> Option<DateTime<Utc>> {
        self.sessions
            .lock()
            .expect("lock")
            .get(session_id)
            .map(|(_, expires_at)| *expires_at)
    }
}

#[async_trait]
impl DatabaseService for FakeDb {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let mut users = self.users.lock().expect("lock");
        if users.values().any(|(user, _)| user.email == email) {
            return Err(PortError::Conflict(format!("User {} already exists", email)));
        }
        let user = User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            role: Role::General,
            email_verified_at: None,
        };
        users.insert(user.user_id, (user.clone(), hashed_password.to_string()));
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.users
            .lock()
            .expect("lock")
            .values()
            .find(|(user, _)| user.email == email)
            .map(|(user, hash)| UserCredentials {
                user_id: user.user_id,
                email: user.email.clone(),
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(email.to_string()))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.users
            .lock()
            .expect("lock")
            .get(&user_id)
            .map(|(user, _)| user.clone())
            .ok_or_else(|| PortError::NotFound(user_id.to_string()))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.sessions
            .lock()
            .expect("lock")
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.sessions.lock().expect("lock").get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn touch_auth_session(
        &self,
        session_id: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        match self.sessions.lock().expect("lock").get_mut(session_id) {
            Some(entry) if entry.1 > Utc::now() => {
                entry.1 = expires_at;
                Ok(())
            }
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.sessions.lock().expect("lock").remove(session_id);
        Ok(())
    }

    async fn purge_expired_auth_sessions(&self) -> PortResult<u64> {
        let mut sessions = self.sessions.lock().expect("lock");
        let before = sessions.len();
        let now = Utc::now();
        sessions.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}

//=========================================================================================
// SessionProvider
//=========================================================================================

pub struct FakeSession {
    pub snapshot: Mutex<SessionSnapshot>,
    pub fail_refresh: AtomicBool,
    pub refreshes: AtomicUsize,
}

impl FakeSession {
    pub fn new(snapshot: SessionSnapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(snapshot),
            fail_refresh: AtomicBool::new(false),
            refreshes: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, snapshot: SessionSnapshot) {
        *self.snapshot.lock().expect("lock") = snapshot;
    }
}

#[async_trait]
impl SessionProvider for FakeSession {
    async fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.lock().expect("lock").clone()
    }

    async fn refresh(&self) -> PortResult<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh.load(Ordering::SeqCst) {
            Err(PortError::Network("session endpoint unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

//=========================================================================================
// TripPeopleBackend
//=========================================================================================

#[derive(Default)]
pub struct FakeBackend {
    pub people: Mutex<Vec<TripPerson>>,
    pub offline: AtomicBool,
    pub list_calls: AtomicUsize,
    pub identities: Mutex<Vec<BackendIdentity>>,
    pub role_updates: Mutex<Vec<(String, Role)>>,
    pub profile_names: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn with(people: Vec<TripPerson>) -> Arc<Self> {
        Arc::new(Self {
            people: Mutex::new(people),
            ..Self::default()
        })
    }

    fn record(&self, identity: &BackendIdentity) -> PortResult<()> {
        self.identities.lock().expect("lock").push(identity.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(PortError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

fn from_new(id: i64, new: &NewTripPerson) -> TripPerson {
    let mut created = person(id, &new.name, new.relationship_id);
    created.birthday = new.birthday.clone();
    created.likes = new.likes.clone();
    created.dislikes = new.dislikes.clone();
    created.address = new.address.clone();
    created.memo = new.memo.clone();
    created
}

fn profile(identity: &BackendIdentity, name: String) -> Profile {
    Profile {
        id: 7,
        name,
        email: "hanako@example.com".to_string(),
        provider: identity.provider.clone(),
        created_at: Some("2024-04-01T09:00:00Z".to_string()),
        updated_at: None,
    }
}

#[async_trait]
impl TripPeopleBackend for FakeBackend {
    async fn list_trip_people(&self, identity: &BackendIdentity) -> PortResult<Vec<TripPerson>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.record(identity)?;
        Ok(self.people.lock().expect("lock").clone())
    }

    async fn get_trip_person(&self, identity: &BackendIdentity, id: i64) -> PortResult<TripPerson> {
        self.record(identity)?;
        self.people
            .lock()
            .expect("lock")
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Trip person {}", id)))
    }

    async fn create_trip_person(
        &self,
        identity: &BackendIdentity,
        new: &NewTripPerson,
    ) -> PortResult<TripPerson> {
        self.record(identity)?;
        let mut people = self.people.lock().expect("lock");
        let id = people.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let created = from_new(id, new);
        people.push(created.clone());
        Ok(created)
    }

    async fn update_trip_person(
        &self,
        identity: &BackendIdentity,
        id: i64,
        changes: &NewTripPerson,
    ) -> PortResult<TripPerson> {
        self.record(identity)?;
        let mut people = self.people.lock().expect("lock");
        let slot = people
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Trip person {}", id)))?;
        *slot = from_new(id, changes);
        Ok(slot.clone())
    }

    async fn delete_trip_person(&self, identity: &BackendIdentity, id: i64) -> PortResult<()> {
        self.record(identity)?;
        let mut people = self.people.lock().expect("lock");
        let before = people.len();
        people.retain(|p| p.id != id);
        if people.len() == before {
            return Err(PortError::NotFound(format!("Trip person {}", id)));
        }
        Ok(())
    }

    async fn get_profile(&self, identity: &BackendIdentity) -> PortResult<Profile> {
        self.record(identity)?;
        let name = self
            .profile_names
            .lock()
            .expect("lock")
            .last()
            .cloned()
            .unwrap_or_else(|| "Hanako".to_string());
        Ok(profile(identity, name))
    }

    async fn update_profile(&self, identity: &BackendIdentity, name: &str) -> PortResult<Profile> {
        self.record(identity)?;
        self.profile_names.lock().expect("lock").push(name.to_string());
        Ok(profile(identity, name.to_string()))
    }

    async fn list_users(&self, identity: &BackendIdentity) -> PortResult<Value> {
        self.record(identity)?;
        Ok(json!({ "users": [{ "id": "1", "role": "admin" }] }))
    }

    async fn update_user_role(
        &self,
        identity: &BackendIdentity,
        user_id: &str,
        role: Role,
    ) -> PortResult<Value> {
        self.record(identity)?;
        self.role_updates
            .lock()
            .expect("lock")
            .push((user_id.to_string(), role));
        Ok(json!({ "success": true, "user": { "id": user_id, "role": role.as_str() } }))
    }
}

//=========================================================================================
// AppState
//=========================================================================================

pub fn config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/trip_journal_test".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub fn app_state(db: Arc<FakeDb>, backend: Arc<FakeBackend>) -> Arc<AppState> {
    app_state_with(db, backend, config())
}

pub fn app_state_with(db: Arc<FakeDb>, backend: Arc<FakeBackend>, config: Config) -> Arc<AppState> {
    Arc::new(AppState {
        db,
        backend,
        config: Arc::new(config),
    })
}
