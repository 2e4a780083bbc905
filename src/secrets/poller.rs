//! Drift poller.
//!
//! A fixed-interval backstop for rotations the scheduled timer cannot see,
//! such as an operator rotating a secret by hand. Each tick makes one
//! metadata-only call; only a strictly newer last-rotation timestamp leads
//! to a refresh.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::Result;
use super::manager::{RefreshTrigger, SecretManager, WeakSecretManager};

/// Result of one drift check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DriftOutcome {
    /// The store reported no last-rotation timestamp
    NoRotationReported,
    /// Same timestamp as the recorded rotation
    Unchanged,
    /// Older than the recorded rotation (clock skew or a stale read)
    Stale { observed: DateTime<Utc>, known: DateTime<Utc> },
    /// Newer, but another refresh picked it up while this check waited
    AlreadyApplied { observed: DateTime<Utc> },
    /// Newer, but a refresh for it already ran and failed; the armed
    /// retry timer owns the next attempt
    RetryPending { observed: DateTime<Utc> },
    /// Newer; a full refresh and rearm ran
    Refreshed { observed: DateTime<Utc> },
}

impl SecretManager {
    /// Compare the store's last-rotation timestamp with the recorded one and
    /// refresh when it moved forward.
    ///
    /// The metadata read happens outside the refresh guard; the comparison
    /// is repeated under the guard before refreshing.
    pub async fn check_for_drift(&self) -> Result<DriftOutcome> {
        let metadata = self.fetch_tracked_metadata().await?;
        let Some(observed) = metadata.last_rotated_at else {
            return Ok(DriftOutcome::NoRotationReported);
        };

        let state = self.rotation_state();
        match state.last_known_rotation() {
            Some(known) if observed == known => return Ok(DriftOutcome::Unchanged),
            Some(known) if observed < known => {
                debug!(observed = %observed, known = %known, "Ignoring older rotation timestamp");
                return Ok(DriftOutcome::Stale { observed, known });
            }
            _ if state.was_attempted(observed) => {
                debug!(observed = %observed, "Rotation refresh already attempted, waiting for retry timer");
                return Ok(DriftOutcome::RetryPending { observed });
            }
            known => {
                info!(observed = %observed, known = ?known, "Detected out-of-band secret rotation");
            }
        }
        self.metrics().record_drift_detected();

        let guard = self.lock_refresh().await;
        let state = self.rotation_state();
        if !state.is_newer(observed) {
            debug!(observed = %observed, "Rotation already applied by another refresh");
            return Ok(DriftOutcome::AlreadyApplied { observed });
        }
        if state.was_attempted(observed) {
            debug!(observed = %observed, "Rotation refresh attempted by another trigger");
            return Ok(DriftOutcome::RetryPending { observed });
        }

        self.refresh_locked(&guard, RefreshTrigger::Drift).await?;
        Ok(DriftOutcome::Refreshed { observed })
    }
}

/// Background loop calling [`SecretManager::check_for_drift`] on a fixed
/// interval until shutdown.
pub(crate) struct DriftPoller {
    manager: WeakSecretManager,
    interval: Duration,
    shutdown: CancellationToken,
}

impl DriftPoller {
    pub(crate) fn new(
        manager: WeakSecretManager,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self { manager, interval, shutdown }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        // The initial load just ran; the first check waits one full interval.
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "Drift poller started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(manager) = self.manager.upgrade() else {
                break;
            };

            match manager.check_for_drift().await {
                Ok(DriftOutcome::Refreshed { observed }) => {
                    info!(observed = %observed, "Refreshed secrets after detected rotation");
                }
                Ok(outcome) => debug!(outcome = ?outcome, "Drift check complete"),
                Err(err) => {
                    manager.metrics().record_poll_error(err.kind());
                    warn!(error = %err, kind = err.kind(), "Drift check failed");
                }
            }
        }

        info!("Drift poller stopped");
    }
}
