use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SweeperConfig;
use crate::store::Store;

/// Shortest interval the sweeper will run at
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Background task that periodically removes expired entries from a [`Store`]
///
/// The store never expires entries on its own; the sweeper is one driver for
/// [`Store::delete_expired`], alongside explicit calls.
pub struct Sweeper;

impl Sweeper {
    /// Spawns the sweep loop on the current Tokio runtime
    ///
    /// Intervals shorter than [`MIN_SWEEP_INTERVAL`], including zero, are
    /// raised to it.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn spawn(store: Store, config: SweeperConfig) -> SweeperHandle {
        let interval = config.interval.max(MIN_SWEEP_INTERVAL);
        if interval != config.interval {
            tracing::warn!(?interval, "sweep interval too short, clamping");
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Self::run(store, interval, shutdown_rx));

        SweeperHandle {
            shutdown_tx,
            task: Some(task),
        }
    }

    async fn run(store: Store, interval: Duration, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        // Skip the first immediate tick - we want to wait for the interval first
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.delete_expired();
                    if removed > 0 {
                        tracing::debug!(removed, "swept expired entries");
                    }
                }
                changed = shutdown_rx.changed() => {
                    // A closed channel means the handle was dropped
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("sweeper stopped");
    }
}

/// Handle to a running [`Sweeper`]
///
/// Dropping the handle stops the sweeper.
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop after the current sweep, if any
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stops the sweeper and waits for the task to finish
    pub async fn join(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
