use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::cache::{CacheContext, Entry};

/// Refreshes one entry every `period` until aborted or no longer observed.
///
/// The first tick fires one period after start: the observation that spawned
/// the poller has already decided whether an immediate fetch is needed.
pub(crate) fn spawn(entry: Arc<Entry>, ctx: Arc<CacheContext>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::debug!("polling {} every {:?}", entry.key(), period);

        loop {
            ticker.tick().await;
            if !entry.is_observed() {
                break;
            }
            // Joins a running fetch instead of stacking a second one.
            entry.start_fetch(&ctx);
        }
    })
}
