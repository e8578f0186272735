//! Repeating batch driver
//!
//! Runs a batch, waits the configured interval, repeats. The target list is
//! re-read before every batch so it can be edited without a restart.

use std::path::PathBuf;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::runner::{BatchRunner, BatchSummary};
use crate::wallet::load_targets;

pub struct Scheduler {
    runner: BatchRunner,
    targets_path: PathBuf,
    interval: Duration,
}

impl Scheduler {
    pub fn new(runner: BatchRunner, targets_path: impl Into<PathBuf>) -> Self {
        let interval = runner.config().schedule.interval();
        Self {
            runner,
            targets_path: targets_path.into(),
            interval,
        }
    }

    /// Load the current target list and run one batch
    ///
    /// Returns `None` when the target list could not be loaded.
    pub async fn run_once(&mut self, cancel: &CancellationToken) -> Option<BatchSummary> {
        let targets = match load_targets(&self.targets_path, self.runner.wallet().address()) {
            Ok(targets) => targets,
            Err(e) => {
                error!("Skipping batch: {}", e);
                return None;
            }
        };

        Some(self.runner.run_batch(&targets, cancel).await)
    }

    /// Run batches until `cancel` fires; returns the number of batches run
    pub async fn run(mut self, cancel: CancellationToken) -> u64 {
        let mut completed = 0u64;

        loop {
            if self.run_once(&cancel).await.is_some() {
                completed += 1;
            }

            if cancel.is_cancelled() {
                break;
            }

            info!("Next batch in {}", humanize(self.interval));
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = cancel.cancelled() => break,
            }
        }

        info!("Scheduler stopped after {} batches", completed);
        completed
    }

    /// Spawn [`Scheduler::run`] onto the runtime
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<u64> {
        tokio::spawn(self.run(cancel))
    }
}

fn humanize(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
