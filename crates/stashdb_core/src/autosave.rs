//! Periodic background saves.

use crate::config::AutosaveConfig;
use crate::registry::StorageRegistry;
use crate::storage::SaveGuard;
use crate::types::SaveOutcome;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

/// Something that owns a [`StorageRegistry`].
///
/// Hosts implement this to hand their registry to an [`AutosaveTask`].
pub trait StorageHost: Send + Sync + 'static {
    /// The registry to save.
    fn registry(&self) -> &StorageRegistry;
}

impl StorageHost for StorageRegistry {
    fn registry(&self) -> &StorageRegistry {
        self
    }
}

/// Saves every storage of a host on a fixed period.
///
/// Only one sweep runs at a time: a tick that arrives while the previous
/// sweep is still running is skipped.
pub struct AutosaveTask<H: StorageHost> {
    host: Arc<H>,
    config: AutosaveConfig,
    running: Arc<AtomicBool>,
}

impl<H: StorageHost> Clone for AutosaveTask<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            config: self.config,
            running: Arc::clone(&self.running),
        }
    }
}

impl<H: StorageHost> AutosaveTask<H> {
    /// Creates a task for `host`.
    #[must_use]
    pub fn new(host: Arc<H>, config: AutosaveConfig) -> Self {
        Self {
            host,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AutosaveConfig {
        &self.config
    }

    /// Returns true while a sweep started by this task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs one sweep of every storage.
    ///
    /// Returns `None` without doing anything if a sweep is already running.
    /// Dropping the returned future part-way still clears the running
    /// marker.
    pub async fn run_once(&self) -> Option<Vec<(String, SaveOutcome)>> {
        let Some(_guard) = SaveGuard::try_acquire(&self.running) else {
            debug!("autosave sweep still running, skipping tick");
            return None;
        };
        let outcomes = self.host.registry().save_all_async().await;
        debug!(storages = outcomes.len(), "autosave sweep finished");
        Some(outcomes)
    }

    /// Starts ticking on the current runtime.
    ///
    /// The first sweep happens one period after spawning. A zero period
    /// ticks at [`MIN_AUTOSAVE_PERIOD`](crate::MIN_AUTOSAVE_PERIOD).
    #[must_use = "dropping the handle leaves the task running without a way to stop it"]
    pub fn spawn(self) -> AutosaveHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let period = self.config.effective_period();

        let join = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // the first tick completes immediately
            interval.tick().await;

            let mut in_flight: Option<JoinHandle<()>> = None;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if in_flight.as_ref().is_some_and(|h| !h.is_finished()) {
                            debug!("autosave sweep still running, skipping tick");
                            continue;
                        }
                        let task = self.clone();
                        in_flight = Some(tokio::spawn(async move {
                            task.run_once().await;
                        }));
                    }
                    _ = &mut stop_rx => break,
                }
            }

            if let Some(handle) = in_flight {
                if let Err(e) = handle.await {
                    error!(error = %e, "autosave sweep failed");
                }
            }
            let outcomes = self.host.registry().save_all().await;
            info!(storages = outcomes.len(), "autosave stopped after final save");
            outcomes
        });

        info!(period = ?period, "autosave started");
        AutosaveHandle {
            stop: Some(stop_tx),
            join,
        }
    }
}

/// Handle to a running [`AutosaveTask`].
pub struct AutosaveHandle {
    stop: Option<oneshot::Sender<()>>,
    join: JoinHandle<Vec<(String, SaveOutcome)>>,
}

impl AutosaveHandle {
    /// Stops ticking, waits for a running sweep, and performs one final
    /// save of every storage. Returns the outcomes of that final save.
    pub async fn shutdown(mut self) -> Vec<(String, SaveOutcome)> {
        if let Some(stop) = self.stop.take() {
            // the loop may already be gone; the join below reports why
            let _ = stop.send(());
        }
        match (&mut self.join).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                error!(error = %e, "autosave task failed");
                Vec::new()
            }
        }
    }

    /// Returns true if the task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
