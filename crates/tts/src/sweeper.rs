use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::server::Server;

/// Spawn the periodic asset sweep
///
/// The first sweep runs one interval after startup. The task exits when
/// `shutdown` is cancelled.
pub fn spawn_sweeper(server: Arc<Server>, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::debug!("asset sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    server.store().sweep(jiff::Timestamp::now()).await;
                }
            }
        }
    })
}
