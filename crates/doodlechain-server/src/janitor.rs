use std::time::Duration;

use tokio::task::JoinHandle;

use doodlechain_core::time::unix_millis_now;

use crate::state::AppState;

/// Spawn the background sweep that reclaims rooms whose every member
/// has been disconnected for longer than the configured timeout.
pub fn spawn_janitor(state: AppState) -> JoinHandle<()> {
    let sweep_interval = Duration::from_secs(state.config.rooms.sweep_interval_secs);
    let staleness = Duration::from_secs(state.config.rooms.stale_timeout_secs);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        // The first tick fires immediately; skip it so a restart does
        // not race room creation.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = {
                let mut registry = state.registry.write().await;
                registry.sweep_stale(unix_millis_now(), staleness)
            };
            if removed > 0 {
                tracing::info!(removed, "Swept stale rooms");
            }
        }
    })
}
