use std::{sync::Arc, time::Duration};

use {
    tokio::{sync::Mutex, task::JoinHandle, time::MissedTickBehavior},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::temp::TempArtifactStore;

/// Shortest sweep period; `tokio::time::interval` rejects zero.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Background task that periodically sweeps expired temp artifacts.
///
/// Runs until [`TempSweeper::stop`] is called or the token is cancelled.
pub struct TempSweeper {
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TempSweeper {
    /// Start sweeping `store` every `interval`, deleting files older than `ttl`.
    ///
    /// The first sweep happens one full interval after start. Intervals below
    /// [`MIN_SWEEP_INTERVAL`] are raised to it.
    pub fn spawn(store: Arc<TempArtifactStore>, interval: Duration, ttl: Duration) -> Self {
        let interval = if interval < MIN_SWEEP_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                "sweep interval too short, using the minimum"
            );
            MIN_SWEEP_INTERVAL
        } else {
            interval
        };
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                dir = %store.dir().display(),
                interval_secs = interval.as_secs(),
                ttl_secs = ttl.as_secs(),
                "temp sweeper started"
            );

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = store.sweep(ttl).await;
                        debug!(
                            scanned = report.scanned,
                            removed = report.removed,
                            failed = report.failed,
                            "temp sweep finished"
                        );
                    },
                }
            }
        });

        Self {
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the loop and wait for an in-progress sweep to finish.
    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().await.take()
            && let Err(e) = handle.await
        {
            warn!(error = %e, "temp sweeper task ended abnormally");
        }
        info!("temp sweeper stopped");
    }
}

impl Drop for TempSweeper {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
