//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for the live companion list.
//! Each connection owns one `AuthGuard`, one filter configuration and at most
//! one session refresh task.

use crate::web::{
    guard::member_guard,
    protocol::{ClientMessage, ServerMessage},
    refresh_task::{refresh_process, RefreshEvent, RefreshOutcome},
    rest::TripPeopleList,
    state::{AppState, RequestSession},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use trip_journal_core::domain::TripPerson;
use trip_journal_core::filter::FilterSpec;
use trip_journal_core::guard::{AuthGuard, GuardConfig, GuardNotice, RefreshSchedule};
use trip_journal_core::ports::{BackendIdentity, SessionProvider, TripPeopleBackend};

//=========================================================================================
// LiveList (Specific to One WebSocket Connection)
//=========================================================================================

struct RefreshHandle {
    schedule: RefreshSchedule,
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// The state behind one live companion list.
///
/// Every method returns the messages the client should receive, in order.
pub struct LiveList {
    provider: Arc<dyn SessionProvider>,
    backend: Arc<dyn TripPeopleBackend>,
    auth_provider: String,
    guard: AuthGuard,
    filters: FilterSpec,
    people: Option<Vec<TripPerson>>,
    refresh: Option<RefreshHandle>,
    generation: u64,
    events: mpsc::Sender<RefreshEvent>,
}

impl LiveList {
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        backend: Arc<dyn TripPeopleBackend>,
        auth_provider: impl Into<String>,
        config: GuardConfig,
        events: mpsc::Sender<RefreshEvent>,
    ) -> Self {
        Self {
            provider,
            backend,
            auth_provider: auth_provider.into(),
            guard: AuthGuard::new(config),
            filters: FilterSpec::empty(),
            people: None,
            refresh: None,
            generation: 0,
            events,
        }
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn check_access(&self) -> bool {
        self.guard.check_access()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_some()
    }

    /// Re-reads the session, runs the guard, and publishes the list if access
    /// is granted. With `refetch` the companions are fetched again.
    pub async fn sync(&mut self, refetch: bool) -> Vec<ServerMessage> {
        // 1. Evaluate the guard against the current session
        let snapshot = self.provider.snapshot().await;
        let decision = self.guard.evaluate(&snapshot);

        let mut out = vec![ServerMessage::Guard {
            state: decision.state(),
            ui: decision.ui.clone(),
        }];
        if let Some(GuardNotice::AuthError(error)) = &decision.notice {
            out.push(ServerMessage::AuthError {
                error: error.clone(),
            });
        }
        if let Some(redirect) = &decision.redirect {
            out.push(ServerMessage::Redirect {
                to: redirect.to.clone(),
                reason: redirect.reason,
            });
        }

        // 2. Follow the refresh command
        self.schedule_refresh(decision.refresh);

        // 3. Publish the list only behind a granted guard
        let user = match decision.user() {
            Some(user) if decision.check_access() => user,
            _ => {
                self.people = None;
                return out;
            }
        };

        if refetch || self.people.is_none() {
            let identity = BackendIdentity {
                provider: self.auth_provider.clone(),
                uid: user.backend_uid().to_string(),
            };
            match self.backend.list_trip_people(&identity).await {
                Ok(people) => self.people = Some(people),
                Err(e) => {
                    error!("Failed to fetch trip people: {:?}", e);
                    out.push(ServerMessage::Error {
                        message: e.to_string(),
                    });
                    return out;
                }
            }
        }

        out.extend(self.list_message());
        out
    }

    /// Replaces the filter configuration and re-runs the pipeline over the
    /// records already loaded.
    pub fn set_filters(&mut self, filters: FilterSpec) -> Vec<ServerMessage> {
        self.filters = filters;
        if !self.guard.check_access() {
            return Vec::new();
        }
        self.list_message().into_iter().collect()
    }

    /// Swaps the guard configuration. The running refresh task is stopped and
    /// the re-evaluation starts a new one if the configuration asks for it.
    pub async fn reconfigure(&mut self, config: GuardConfig) -> Vec<ServerMessage> {
        self.stop_refresh();
        self.guard.reconfigure(config);
        self.sync(false).await
    }

    /// Handles the outcome of a refresh tick. Outcomes from a task that has
    /// since been replaced are dropped.
    pub async fn on_refresh(&mut self, event: RefreshEvent) -> Vec<ServerMessage> {
        if self.refresh.is_none() || event.generation != self.generation {
            return Vec::new();
        }
        match event.outcome {
            RefreshOutcome::Refreshed => self.sync(false).await,
            RefreshOutcome::Failed(cause) => vec![ServerMessage::AuthError {
                error: self.guard.report_refresh_failure(&cause),
            }],
        }
    }

    fn list_message(&self) -> Option<ServerMessage> {
        let people = self.people.as_deref()?;
        Some(ServerMessage::TripPeople {
            list: TripPeopleList::build(people, &self.filters),
            filters: self.filters.clone(),
        })
    }

    fn schedule_refresh(&mut self, schedule: Option<RefreshSchedule>) {
        if self.refresh.as_ref().map(|handle| handle.schedule) == schedule {
            return;
        }
        self.stop_refresh();
        let Some(schedule) = schedule else {
            return;
        };

        self.generation += 1;
        let token = CancellationToken::new();
        let task = tokio::spawn(refresh_process(
            self.provider.clone(),
            schedule.every,
            self.generation,
            self.events.clone(),
            token.clone(),
        ));
        self.refresh = Some(RefreshHandle {
            schedule,
            token,
            task,
        });
    }

    fn stop_refresh(&mut self) {
        if let Some(handle) = self.refresh.take() {
            handle.token.cancel();
            handle.task.abort();
        }
    }
}

impl Drop for LiveList {
    fn drop(&mut self) {
        self.stop_refresh();
    }
}

//=========================================================================================
// WebSocket Handler
//=========================================================================================

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<RequestSession>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, session))
}

async fn send_all(sender: &mut SplitSink<WebSocket, Message>, messages: Vec<ServerMessage>) -> bool {
    for message in messages {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize server message: {:?}", e);
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            return false;
        }
    }
    true
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, session: RequestSession) {
    info!("New live list connection established.");
    let (mut sender, mut receiver) = socket.split();
    let (events_tx, mut events_rx) = mpsc::channel(8);

    let provider: Arc<dyn SessionProvider> =
        Arc::new(app_state.session_provider(session.session_id));
    let config = member_guard().refresh_every(app_state.config.session_refresh_interval);
    let mut live = LiveList::new(
        provider,
        app_state.backend.clone(),
        app_state.config.auth_provider.clone(),
        config,
        events_tx,
    );

    // --- 1. Initial evaluation ---
    if !send_all(&mut sender, live.sync(true).await).await {
        info!("Client disconnected during initial sync.");
        return;
    }

    // --- 2. Main Message Loop ---
    loop {
        let messages = tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::SetFilters { filters }) => live.set_filters(filters),
                    Ok(ClientMessage::ClearFilters) => live.set_filters(FilterSpec::empty()),
                    Ok(ClientMessage::Reload) => live.sync(true).await,
                    Err(e) => {
                        warn!("Failed to deserialize client message: {}", e);
                        vec![ServerMessage::Error { message: format!("Invalid message: {}", e) }]
                    }
                },
                Some(Ok(Message::Close(_))) => {
                    info!("Client sent close message.");
                    break;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!("WebSocket receive failed: {:?}", e);
                    break;
                }
                None => {
                    info!("Client disconnected.");
                    break;
                }
            },
            Some(event) = events_rx.recv() => live.on_refresh(event).await,
        };

        if !send_all(&mut sender, messages).await {
            info!("Client went away while sending.");
            break;
        }
    }

    // --- 3. Cleanup ---
    drop(live);
    info!("Live list connection closed.");
}
