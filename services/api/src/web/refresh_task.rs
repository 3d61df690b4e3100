//! services/api/src/web/refresh_task.rs
//!
//! This module contains the asynchronous "worker" that keeps a live
//! connection's session fresh while the guarded view is open.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use trip_journal_core::ports::SessionProvider;

/// The result of one refresh attempt, tagged with the task that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshEvent {
    pub generation: u64,
    pub outcome: RefreshOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    Failed(String),
}

/// Refreshes the session every `every`, starting one interval from now.
///
/// Runs until `cancellation_token` fires or the receiving side goes away.
/// A failed refresh is reported and the loop keeps going.
pub async fn refresh_process(
    provider: Arc<dyn SessionProvider>,
    every: Duration,
    generation: u64,
    events: mpsc::Sender<RefreshEvent>,
    cancellation_token: CancellationToken,
) {
    info!(?every, generation, "Session refresh task started.");
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!(generation, "Session refresh task cancelled.");
                return;
            }
            _ = ticker.tick() => {
                let outcome = match provider.refresh().await {
                    Ok(()) => RefreshOutcome::Refreshed,
                    Err(e) => RefreshOutcome::Failed(e.to_string()),
                };
                debug!(generation, ?outcome, "Session refresh attempted.");
                if events.send(RefreshEvent { generation, outcome }).await.is_err() {
                    return;
                }
            }
        }
    }
}
