//! Refresh scheduling.
//!
//! [`RefreshPolicy`] turns the store's "next rotation" metadata into a delay,
//! and [`RefreshTimer`] owns the single outstanding one-shot timer. The
//! scheduler moves `Idle → Armed → Firing → Armed`, and back to `Idle` on
//! shutdown.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Delay inputs for the refresh scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Added to the next-rotation delay so the refresh lands after the rotation finishes
    pub grace_period: Duration,
    /// Used when metadata is unavailable and after a failed refresh
    pub fallback_delay: Duration,
    /// Used when the reported next rotation is already in the past
    pub overdue_delay: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_millis(1000),
            fallback_delay: Duration::from_secs(300),
            overdue_delay: Duration::from_secs(10),
        }
    }
}

/// Why a particular delay was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleReason {
    NextRotation,
    MetadataUnavailable,
    RotationOverdue,
    RetryAfterFailure,
}

impl ScheduleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NextRotation => "next_rotation",
            Self::MetadataUnavailable => "metadata_unavailable",
            Self::RotationOverdue => "rotation_overdue",
            Self::RetryAfterFailure => "retry_after_failure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleDecision {
    pub delay: Duration,
    pub reason: ScheduleReason,
}

impl RefreshPolicy {
    /// Delay until the next scheduled refresh.
    ///
    /// `next_rotation - now + grace`, clamped to `overdue_delay` when negative,
    /// or `fallback_delay` when no next rotation is known.
    pub fn decide(
        &self,
        next_rotation_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> ScheduleDecision {
        let Some(next_rotation_at) = next_rotation_at else {
            return ScheduleDecision {
                delay: self.fallback_delay,
                reason: ScheduleReason::MetadataUnavailable,
            };
        };

        let grace_ms = i64::try_from(self.grace_period.as_millis()).unwrap_or(i64::MAX);
        let delay_ms = (next_rotation_at - now).num_milliseconds().saturating_add(grace_ms);

        if delay_ms < 0 {
            warn!(
                next_rotation_at = %next_rotation_at,
                overdue_ms = -delay_ms,
                clamped_delay_ms = self.overdue_delay.as_millis() as u64,
                "Rotation already overdue, clamping refresh delay"
            );
            return ScheduleDecision {
                delay: self.overdue_delay,
                reason: ScheduleReason::RotationOverdue,
            };
        }

        ScheduleDecision {
            delay: Duration::from_millis(delay_ms as u64),
            reason: ScheduleReason::NextRotation,
        }
    }

    /// Delay after a failed refresh.
    pub fn retry_after_failure(&self) -> ScheduleDecision {
        ScheduleDecision { delay: self.fallback_delay, reason: ScheduleReason::RetryAfterFailure }
    }
}

/// Observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Armed { deadline: DateTime<Utc>, reason: ScheduleReason },
    Firing,
}

/// The single outstanding timer for the next scheduled refresh.
#[derive(Debug)]
pub struct ScheduledRefreshHandle {
    generation: u64,
    deadline: DateTime<Utc>,
    reason: ScheduleReason,
    task: JoinHandle<()>,
}

impl ScheduledRefreshHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    fn cancel(self) {
        self.task.abort();
    }
}

/// Result of arming the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    pub generation: u64,
    /// Whether a previously armed timer was cancelled to make room
    pub replaced_previous: bool,
}

#[derive(Debug, Default)]
struct TimerSlot {
    last_generation: u64,
    armed: Option<ScheduledRefreshHandle>,
    firing: bool,
    shut_down: bool,
}

/// Owner of the one armed [`ScheduledRefreshHandle`].
///
/// Arming always cancels the previous handle first, so two scheduled
/// refreshes can never be pending at once.
#[derive(Debug, Default)]
pub struct RefreshTimer {
    slot: Mutex<TimerSlot>,
    armed_total: AtomicU64,
    cancelled_total: AtomicU64,
}

impl RefreshTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, TimerSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm a one-shot timer that runs `on_fire(generation)` after the delay.
    ///
    /// Returns `None` once the timer is shut down.
    pub fn arm<F, Fut>(&self, decision: ScheduleDecision, on_fire: F) -> Option<ArmedTimer>
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot();
        if slot.shut_down {
            return None;
        }

        let replaced_previous = match slot.armed.take() {
            Some(previous) => {
                debug!(generation = previous.generation, "Cancelling previously armed refresh timer");
                previous.cancel();
                self.cancelled_total.fetch_add(1, Ordering::SeqCst);
                true
            }
            None => false,
        };

        slot.last_generation += 1;
        let generation = slot.last_generation;
        let delay = decision.delay;
        let deadline = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::days(365));

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire(generation).await;
        });

        slot.armed =
            Some(ScheduledRefreshHandle { generation, deadline, reason: decision.reason, task });
        slot.firing = false;
        self.armed_total.fetch_add(1, Ordering::SeqCst);

        Some(ArmedTimer { generation, replaced_previous })
    }

    /// Claim the firing slot for `generation`.
    ///
    /// Returns false when the timer was re-armed or shut down after this
    /// generation's sleep finished; the caller must then do nothing.
    pub fn begin_fire(&self, generation: u64) -> bool {
        let mut slot = self.slot();
        if slot.shut_down {
            return false;
        }
        match &slot.armed {
            Some(handle) if handle.generation == generation => {
                // Dropping our own JoinHandle detaches; it does not abort the running task.
                slot.armed = None;
                slot.firing = true;
                true
            }
            _ => false,
        }
    }

    /// Cancel the armed timer and refuse further arming.
    pub fn shutdown(&self) {
        let mut slot = self.slot();
        slot.shut_down = true;
        slot.firing = false;
        if let Some(handle) = slot.armed.take() {
            handle.cancel();
            self.cancelled_total.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn state(&self) -> SchedulerState {
        let slot = self.slot();
        if slot.shut_down {
            return SchedulerState::Idle;
        }
        if slot.firing {
            return SchedulerState::Firing;
        }
        match &slot.armed {
            Some(handle) => {
                SchedulerState::Armed { deadline: handle.deadline, reason: handle.reason }
            }
            None => SchedulerState::Idle,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot().armed.is_some()
    }

    /// Total number of arm calls that produced a timer.
    pub fn armed_count(&self) -> u64 {
        self.armed_total.load(Ordering::SeqCst)
    }

    /// Total number of armed timers cancelled before firing.
    pub fn cancelled_count(&self) -> u64 {
        self.cancelled_total.load(Ordering::SeqCst)
    }
}
