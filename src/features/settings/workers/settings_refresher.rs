use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::core::error::Result;
use crate::features::settings::repository::SettingsRepository;
use crate::features::settings::services::SettingsSnapshot;

/// Background worker that re-reads the active storage settings on a fixed
/// interval and swaps them into the shared snapshot.
pub struct SettingsRefresher {
    repo: Arc<dyn SettingsRepository>,
    snapshot: Arc<SettingsSnapshot>,
    period: Duration,
}

/// Handle used to stop a running refresher and wait for it to finish
pub struct RefresherHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefresherHandle {
    /// Signal the worker to stop and wait until it has exited
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Settings refresher ended abnormally: {}", e);
        }
    }
}

impl SettingsRefresher {
    pub fn new(
        repo: Arc<dyn SettingsRepository>,
        snapshot: Arc<SettingsSnapshot>,
        period: Duration,
    ) -> Self {
        Self {
            repo,
            snapshot,
            period,
        }
    }

    /// Spawn the refresh loop on the current runtime
    pub fn spawn(self) -> RefresherHandle {
        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move { self.run(stop_rx).await });
        RefresherHandle { stop, task }
    }

    async fn run(&self, mut stop: watch::Receiver<bool>) {
        tracing::info!(
            "Starting settings refresher (every {}s)",
            self.period.as_secs()
        );

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the snapshot is already fresh
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh_once().await {
                        tracing::warn!("Keeping previous storage settings, refresh failed: {}", e);
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Settings refresher stopped");
    }

    /// Read the active row once and publish it; returns whether a row was found
    pub async fn refresh_once(&self) -> Result<bool> {
        match self.repo.get_active().await? {
            Some(settings) => {
                self.snapshot.replace(settings);
                Ok(true)
            }
            None => {
                tracing::warn!("No active storage settings found, keeping previous snapshot");
                Ok(false)
            }
        }
    }
}
