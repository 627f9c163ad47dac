// ABOUTME: Background expiry of stale pending changes
// ABOUTME: Periodic tokio task that is stopped on demand or when the sweeper is dropped

use super::{SharedChangeTracker, TrackerConfig};
use chrono::Utc;
use std::sync::PoisonError;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// `tokio::time::interval` panics on a zero period
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Owns the periodic sweep task for one tracker.
///
/// The task is aborted by `stop` and on drop, so ending an editing session
/// never leaves a timer running.
pub struct ExpirySweeper {
    tracker: SharedChangeTracker,
    sweep_interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl ExpirySweeper {
    pub fn new(tracker: SharedChangeTracker, sweep_interval: Duration) -> Self {
        Self {
            tracker,
            sweep_interval: sweep_interval.max(MIN_SWEEP_INTERVAL),
            handle: None,
        }
    }

    /// Create and immediately start a sweeper. Must be called inside a tokio runtime.
    pub fn spawn(tracker: SharedChangeTracker, config: &TrackerConfig) -> Self {
        let mut sweeper = Self::new(tracker, config.sweep_interval);
        sweeper.start();
        sweeper
    }

    /// Start the sweep task. Returns false if it is already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            debug!("Expiry sweeper already running");
            return false;
        }

        info!(
            "Starting pending change expiry sweep (interval: {} seconds)",
            self.sweep_interval.as_secs()
        );

        let tracker = self.tracker.clone();
        let period = self.sweep_interval;

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let removed = tracker
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .sweep_expired(Utc::now());

                if removed > 0 {
                    debug!("Expired {} stale pending changes", removed);
                }
            }
        }));

        true
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Stopped pending change expiry sweep");
        }
    }

    pub fn restart(&mut self) {
        self.stop();
        self.start();
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
