//! One-second countdown ticker.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::coordinator::StatusCoordinator;

/// Interval between countdown ticks.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Spawn a background task that advances the coordinator's countdown
/// once per second.
///
/// Ticks while nothing is waiting are no-ops inside the coordinator, so
/// one ticker runs for the tracker's whole lifetime. The returned
/// `JoinHandle` is aborted during shutdown.
pub fn start_countdown_ticker(
    coordinator: Arc<Mutex<StatusCoordinator>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        // The first tick completes immediately; consume it so the seeded
        // display holds for a full second.
        interval.tick().await;

        loop {
            interval.tick().await;
            coordinator
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .tick();
        }
    })
}
