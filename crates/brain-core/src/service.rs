//! Async driver for a shared [`Brain`].
//!
//! The brain itself has no thread. `BrainService` starts it, spawns a tokio
//! task that calls `tick()` on a fixed interval and, on `stop()`, ends the
//! loop and runs `shutdown()` so a debounced write is never lost.
//!
//! Every access goes through one mutex, so a `record` (append, assign,
//! schedule the write) is never interleaved with a tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::brain::Brain;

pub struct BrainService {
    brain: Arc<Mutex<Brain>>,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

fn lock(brain: &Mutex<Brain>) -> MutexGuard<'_, Brain> {
    brain.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BrainService {
    /// Start the brain and spawn the tick loop on the current runtime.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(mut brain: Brain) -> Self {
        brain.start();
        let period = Duration::from_millis(brain.config().tick_interval_ms.max(1));
        let brain = Arc::new(Mutex::new(brain));
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let shared = Arc::clone(&brain);
        let handle = tokio::spawn(async move {
            info!(interval_ms = period.as_millis() as u64, "brain tick loop started");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let report = lock(&shared).tick();
                        if report.saved || report.analyzed {
                            debug!(saved = report.saved, analyzed = report.analyzed, "tick");
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("brain tick loop ended");
        });

        Self {
            brain,
            stop_tx,
            handle,
        }
    }

    /// Shared handle, for callers that keep their own reference.
    pub fn brain(&self) -> Arc<Mutex<Brain>> {
        Arc::clone(&self.brain)
    }

    /// Run `f` with exclusive access to the brain.
    pub fn with<T>(&self, f: impl FnOnce(&mut Brain) -> T) -> T {
        f(&mut lock(&self.brain))
    }

    /// End the tick loop, then record the app closing and flush.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "brain tick loop did not finish cleanly");
        }
        lock(&self.brain).shutdown();
    }
}
