//! crates/trip_journal_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or transport, apart from the
//! serde shapes the companion backend and the browser already agree on.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::sort::parse_calendar_date;

//=========================================================================================
// Roles
//=========================================================================================

/// Coarse permission level attached to a session.
///
/// Serialised as the backend's numeric form (`0`, `1`, `2`). Roles are compared
/// by equality only: there is deliberately no `Ord` implementation, so a page
/// that asks for `General` does not admit `Admin` unless it lists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    Guest,
    General,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::General => "general",
            Self::Admin => "admin",
        }
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        match role {
            Role::Guest => 0,
            Role::General => 1,
            Role::Admin => 2,
        }
    }
}

/// Error returned when a numeric or textual role is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl TryFrom<u8> for Role {
    type Error = UnknownRole;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Guest),
            1 => Ok(Self::General),
            2 => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Self::Guest),
            "general" => Ok(Self::General),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// Session Snapshot (what the session provider hands the guard)
//=========================================================================================

/// The identity blob carried by an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub email_verified: Option<DateTime<Utc>>,
}

/// A point-in-time view of the session provider's state.
///
/// Serialises as `{"status": "loading"}`, `{"status": "unauthenticated"}` or
/// `{"status": "authenticated", "user": {..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "user", rename_all = "lowercase")]
pub enum SessionSnapshot {
    Loading,
    Unauthenticated,
    Authenticated(SessionUser),
}

impl SessionSnapshot {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    /// The resolved user view, present only for authenticated sessions.
    pub fn auth_user(&self) -> Option<AuthUser> {
        match self {
            Self::Authenticated(user) => Some(AuthUser::from(user.clone())),
            _ => None,
        }
    }
}

/// The user view the rest of the application works with.
///
/// This conversion is the single place a missing session role is resolved:
/// an absent role means `General`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub role: Role,
    pub email_verified: Option<DateTime<Utc>>,
}

impl From<SessionUser> for AuthUser {
    fn from(user: SessionUser) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            image: user.image,
            role: user.role.unwrap_or(Role::General),
            email_verified: user.email_verified,
        }
    }
}

impl AuthUser {
    /// The uid the companion backend knows this user by: the email when
    /// present, otherwise the session id.
    pub fn backend_uid(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}

//=========================================================================================
// Accounts and Login Sessions
//=========================================================================================

/// Represents an account - used throughout app.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub email_verified_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn to_session_user(&self) -> SessionUser {
        SessionUser {
            id: self.user_id.to_string(),
            name: self.name.clone(),
            email: Some(self.email.clone()),
            image: None,
            role: Some(self.role),
            email_verified: self.email_verified_at,
        }
    }
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// The caller's account as the companion backend shows it on the profile page.
/// Only `name` can be changed; the email is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

//=========================================================================================
// Companions (Trip People)
//=========================================================================================

/// A person the user travels with, as the companion backend returns it.
///
/// Dates stay as the backend's strings; the sort stage parses them and
/// degrades gracefully when they are missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripPerson {
    pub id: i64,
    pub name: String,
    pub relationship_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dislikes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl TripPerson {
    /// Whole years between the birthday and `today`.
    ///
    /// Returns `None` when the birthday is missing or unparseable, or when the
    /// computed age is not positive.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let birthday = parse_calendar_date(self.birthday.as_deref()?)?;
        let mut years = today.year() - birthday.year();
        if (today.month(), today.day()) < (birthday.month(), birthday.day()) {
            years -= 1;
        }
        u32::try_from(years).ok().filter(|age| *age > 0)
    }

    pub fn relationship_label(&self) -> &str {
        self.relationship_name
            .as_deref()
            .unwrap_or_else(|| relationship_name(self.relationship_id))
    }
}

/// The payload used to create or update a companion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTripPerson {
    pub name: String,
    pub relationship_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dislikes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

//=========================================================================================
// Relationships
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub id: i64,
    pub name: &'static str,
}

pub const RELATIONSHIPS: [Relationship; 5] = [
    Relationship { id: 1, name: "家族" },
    Relationship { id: 2, name: "友人" },
    Relationship { id: 3, name: "恋人" },
    Relationship { id: 4, name: "同僚" },
    Relationship { id: 5, name: "その他" },
];

pub const UNKNOWN_RELATIONSHIP: &str = "未設定";

pub fn relationship_name(id: i64) -> &'static str {
    RELATIONSHIPS
        .iter()
        .find(|rel| rel.id == id)
        .map_or(UNKNOWN_RELATIONSHIP, |rel| rel.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn session_user(role: Option<Role>) -> SessionUser {
        SessionUser {
            id: "42".to_string(),
            name: Some("Hanako".to_string()),
            email: Some("hanako@example.com".to_string()),
            image: None,
            role,
            email_verified: None,
        }
    }

    #[rstest]
    #[case(0, Role::Guest)]
    #[case(1, Role::General)]
    #[case(2, Role::Admin)]
    fn role_uses_numeric_wire_form(#[case] raw: u8, #[case] role: Role) {
        let parsed: Role = serde_json::from_value(json!(raw)).expect("known role");
        assert_eq!(parsed, role);
        assert_eq!(serde_json::to_value(role).expect("serialise"), json!(raw));
    }

    #[test]
    fn unknown_numeric_role_is_rejected() {
        assert!(serde_json::from_value::<Role>(json!(7)).is_err());
    }

    #[test]
    fn missing_role_resolves_to_general() {
        let user = AuthUser::from(session_user(None));
        assert_eq!(user.role, Role::General);
    }

    #[test]
    fn present_role_is_kept() {
        let user = AuthUser::from(session_user(Some(Role::Guest)));
        assert_eq!(user.role, Role::Guest);
    }

    #[test]
    fn snapshot_wire_shape() {
        let snapshot = SessionSnapshot::Authenticated(session_user(Some(Role::Admin)));
        let value = serde_json::to_value(&snapshot).expect("serialise");
        assert_eq!(value["status"], "authenticated");
        assert_eq!(value["user"]["role"], 2);

        let loading: SessionSnapshot =
            serde_json::from_value(json!({"status": "loading"})).expect("loading");
        assert!(loading.is_loading());
        assert!(loading.auth_user().is_none());
    }

    #[test]
    fn backend_uid_prefers_email() {
        let mut user = AuthUser::from(session_user(None));
        assert_eq!(user.backend_uid(), "hanako@example.com");
        user.email = None;
        assert_eq!(user.backend_uid(), "42");
    }

    #[rstest]
    #[case(2, "友人")]
    #[case(5, "その他")]
    #[case(9, "未設定")]
    fn relationship_labels(#[case] id: i64, #[case] expected: &str) {
        assert_eq!(relationship_name(id), expected);
    }

    #[test]
    fn trip_person_accepts_sparse_backend_json() {
        let person: TripPerson = serde_json::from_value(json!({
            "id": 3,
            "name": "田中",
            "relationship_id": 1,
            "birthday": null,
        }))
        .expect("sparse record");
        assert_eq!(person.birthday, None);
        assert_eq!(person.relationship_label(), "家族");
    }

    #[rstest]
    #[case(Some("1990-05-20"), "2024-05-19", Some(33))]
    #[case(Some("1990-05-20"), "2024-05-20", Some(34))]
    #[case(Some("2030-01-01"), "2024-05-20", None)]
    #[case(Some("not a date"), "2024-05-20", None)]
    #[case(None, "2024-05-20", None)]
    fn age_on_counts_whole_years(
        #[case] birthday: Option<&str>,
        #[case] today: &str,
        #[case] expected: Option<u32>,
    ) {
        let person = TripPerson {
            id: 1,
            name: "A".to_string(),
            relationship_id: 1,
            relationship_name: None,
            birthday: birthday.map(str::to_string),
            age: None,
            display_age: None,
            likes: None,
            dislikes: None,
            address: None,
            memo: None,
            user_id: None,
            created_at: None,
            updated_at: None,
        };
        let today = NaiveDate::parse_from_str(today, "%Y-%m-%d").expect("fixture date");
        assert_eq!(person.age_on(today), expected);
    }
}
