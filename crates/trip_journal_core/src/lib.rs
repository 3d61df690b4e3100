pub mod auth;
pub mod collation;
pub mod domain;
pub mod filter;
pub mod guard;
pub mod ports;
pub mod sort;
pub mod validation;

pub use auth::{AuthError, AuthErrorKind};
pub use domain::{
    relationship_name, AuthUser, NewTripPerson, Profile, Relationship, Role, SessionSnapshot,
    SessionUser, TripPerson, User, UserCredentials, RELATIONSHIPS,
};
pub use filter::{create_empty_filter_spec, filter_trip_people, has_active_filters, FilterSpec};
pub use guard::{
    assess, AuthGuard, GuardConfig, GuardDecision, GuardNotice, GuardState, GuardUi, Redirect,
    RedirectReason, RefreshSchedule,
};
pub use ports::{
    BackendIdentity, DatabaseService, PortError, PortResult, SessionProvider, TripPeopleBackend,
};
pub use sort::{sort_trip_people, SortBy, SortOrder};
pub use validation::{FieldErrors, ProfileForm, TripPersonForm};
