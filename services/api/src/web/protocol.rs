//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the live companion list.

use serde::{Deserialize, Serialize};
use trip_journal_core::auth::AuthError;
use trip_journal_core::filter::FilterSpec;
use trip_journal_core::guard::{GuardState, GuardUi, RedirectReason};

use crate::web::rest::TripPeopleList;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Replaces the search/filter/sort configuration.
    SetFilters { filters: FilterSpec },

    /// Resets to the empty filter configuration.
    ClearFilters,

    /// Re-reads the session and refetches the companions.
    Reload,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The guard is intercepting the view. `ui` is absent once access is granted.
    Guard {
        state: GuardState,
        ui: Option<GuardUi>,
    },

    /// The client should navigate away.
    Redirect { to: String, reason: RedirectReason },

    /// An authentication failure to surface, at most once per condition.
    AuthError { error: AuthError },

    /// The current filtered list.
    TripPeople {
        #[serde(flatten)]
        list: TripPeopleList,
        filters: FilterSpec,
    },

    /// Reports a non-auth failure, such as the backend being unreachable.
    Error { message: String },
}
