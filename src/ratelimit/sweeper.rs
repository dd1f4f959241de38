//! Background eviction of idle ledger entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::algorithm::RateLimitAlgorithm;

/// Shortest interval the sweeper will run at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Spawn a task that periodically sweeps the algorithm's ledger.
///
/// Clients that stop sending traffic would otherwise keep their entries for
/// the life of the process. The task runs until the returned handle is
/// aborted or the runtime shuts down. Intervals below
/// [`MIN_SWEEP_INTERVAL`], including zero, are raised to it.
pub fn spawn_sweeper(algorithm: Arc<dyn RateLimitAlgorithm>, interval: Duration) -> JoinHandle<()> {
    if interval < MIN_SWEEP_INTERVAL {
        warn!(
            requested_ms = interval.as_millis() as u64,
            "Sweep interval too short, using minimum"
        );
    }
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    info!(interval_ms = interval.as_millis() as u64, "Starting ledger sweeper");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let evicted = algorithm.sweep();
            if evicted > 0 {
                info!(
                    evicted = evicted,
                    tracked = algorithm.tracked_clients(),
                    "Evicted idle clients"
                );
            } else {
                debug!("Sweep found no idle clients");
            }
        }
    })
}
