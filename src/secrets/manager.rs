//! Secret lifecycle manager.
//!
//! Owns the cache, the rotation state and the refresh timer, and exposes the
//! one serialized refresh-and-rearm operation. The scheduled timer, the drift
//! poller and manual triggers are all callers of that operation:
//!
//! ```text
//! lock guard → fetch tracked metadata → fetch app_config → fetch database
//!            → replace cache per set → advance rotation state → arm timer
//! ```

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::cache::SecretCache;
use super::client::SecretStoreClient;
use super::error::{Result, SecretsError};
use super::poller::DriftPoller;
use super::rotation::RotationState;
use super::scheduler::{
    RefreshPolicy, RefreshTimer, ScheduleDecision, ScheduleReason, SchedulerState,
};
use super::types::{RotationMetadata, SecretGroup, SecretLocation};
use crate::observability::metrics::MetricsRecorder;

/// What started a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    Initial,
    Scheduled,
    Drift,
    Manual,
}

impl RefreshTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Scheduled => "scheduled",
            Self::Drift => "drift",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated inputs for the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSettings {
    pub app_config: SecretLocation,
    pub database: SecretLocation,
    /// Group whose rotation metadata drives scheduling and drift detection
    pub rotation_tracked: SecretGroup,
    pub policy: RefreshPolicy,
    pub poll_interval: Duration,
    /// Fail [`SecretManager::start`] when the first load fails
    pub require_initial_load: bool,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            app_config: SecretLocation::new("employee-api-secrets", "us-west-2"),
            database: SecretLocation::new("employee-api-db-credentials", "us-west-2"),
            rotation_tracked: SecretGroup::Database,
            policy: RefreshPolicy::default(),
            poll_interval: Duration::from_secs(15),
            require_initial_load: false,
        }
    }
}

impl LifecycleSettings {
    pub fn location(&self, group: SecretGroup) -> &SecretLocation {
        match group {
            SecretGroup::AppConfig => &self.app_config,
            SecretGroup::Database => &self.database,
        }
    }

    pub fn tracked_location(&self) -> &SecretLocation {
        self.location(self.rotation_tracked)
    }
}

/// Summary of one successful refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub trigger: RefreshTrigger,
    pub refreshed: Vec<SecretGroup>,
    pub rotation_advanced: bool,
    pub last_known_rotation: Option<DateTime<Utc>>,
    pub next_delay_ms: u64,
    pub next_reason: ScheduleReason,
    pub completed_at: DateTime<Utc>,
}

/// Latest refresh outcome, published through [`SecretManager::subscribe`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshStatus {
    /// Number of successful refreshes so far
    pub generation: u64,
    pub last_trigger: Option<RefreshTrigger>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    /// Error of the latest cycle, cleared by the next successful one
    pub last_error: Option<String>,
}

impl RefreshStatus {
    pub fn is_healthy(&self) -> bool {
        self.last_success_at.is_some() && self.last_error.is_none()
    }
}

struct ManagerInner {
    store: Arc<dyn SecretStoreClient>,
    cache: Arc<SecretCache>,
    settings: LifecycleSettings,
    // Written only while `refresh_guard` is held.
    rotation: RwLock<RotationState>,
    refresh_guard: Mutex<()>,
    timer: RefreshTimer,
    started: AtomicBool,
    shutdown: CancellationToken,
    status_tx: watch::Sender<RefreshStatus>,
    metrics: MetricsRecorder,
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.timer.shutdown();
    }
}

/// Handle to the process-wide secret lifecycle.
///
/// Cheap to clone; every clone shares the same cache, timer and guard.
#[derive(Clone)]
pub struct SecretManager {
    inner: Arc<ManagerInner>,
}

impl fmt::Debug for SecretManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretManager")
            .field("backend", &self.inner.store.backend_name())
            .field("settings", &self.inner.settings)
            .field("cached_secrets", &self.inner.cache.len())
            .finish()
    }
}

/// Non-owning handle held by background tasks.
#[derive(Clone)]
pub(crate) struct WeakSecretManager {
    inner: Weak<ManagerInner>,
}

impl WeakSecretManager {
    pub(crate) fn upgrade(&self) -> Option<SecretManager> {
        self.inner.upgrade().map(|inner| SecretManager { inner })
    }
}

impl SecretManager {
    pub fn new(store: Arc<dyn SecretStoreClient>, settings: LifecycleSettings) -> Self {
        let (status_tx, _) = watch::channel(RefreshStatus::default());
        Self {
            inner: Arc::new(ManagerInner {
                store,
                cache: Arc::new(SecretCache::new()),
                settings,
                rotation: RwLock::new(RotationState::new()),
                refresh_guard: Mutex::new(()),
                timer: RefreshTimer::new(),
                started: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
                status_tx,
                metrics: MetricsRecorder::new(),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakSecretManager {
        WeakSecretManager { inner: Arc::downgrade(&self.inner) }
    }

    /// Load the cache once, arm the refresh timer and start the drift poller.
    ///
    /// A failed initial load is logged and the manager keeps running on the
    /// fallback delay, unless `require_initial_load` is set.
    pub async fn start(&self) -> Result<()> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            warn!("Secret lifecycle manager already started");
            return Ok(());
        }

        let settings = &self.inner.settings;
        info!(
            backend = self.inner.store.backend_name(),
            app_config = %settings.app_config,
            database = %settings.database,
            rotation_tracked = %settings.rotation_tracked,
            poll_interval_secs = settings.poll_interval.as_secs(),
            "Starting secret lifecycle manager"
        );

        if let Err(err) = self.refresh_and_rearm(RefreshTrigger::Initial).await {
            if settings.require_initial_load {
                error!(error = %err, kind = err.kind(), "Initial secret load failed");
                self.shutdown();
                return Err(err);
            }
            warn!(
                error = %err,
                kind = err.kind(),
                "Initial secret load failed, serving an incomplete cache until the next refresh"
            );
        }

        DriftPoller::new(self.downgrade(), settings.poll_interval, self.inner.shutdown.child_token())
            .spawn();

        Ok(())
    }

    /// Run one guarded refresh-and-rearm cycle.
    ///
    /// Callers queue on the guard; cycles never interleave.
    pub async fn refresh_and_rearm(&self, trigger: RefreshTrigger) -> Result<RefreshReport> {
        let guard = self.lock_refresh().await;
        self.refresh_locked(&guard, trigger).await
    }

    /// Force a full refresh outside the normal cycle, then rearm the timer.
    pub async fn trigger_immediate_refresh(&self) -> Result<RefreshReport> {
        info!("Manual secret refresh requested");
        self.refresh_and_rearm(RefreshTrigger::Manual).await
    }

    /// Re-read rotation metadata and re-arm the timer without fetching values.
    pub async fn schedule_next(&self) -> Result<ScheduleDecision> {
        let _guard = self.lock_refresh().await;
        if self.is_shut_down() {
            return Err(SecretsError::Shutdown);
        }

        let next_rotation_at = match self.fetch_tracked_metadata().await {
            Ok(metadata) => metadata.next_rotation_at,
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "Rotation metadata unavailable, using fallback delay");
                None
            }
        };

        let decision = self.inner.settings.policy.decide(next_rotation_at, Utc::now());
        self.arm(decision);
        Ok(decision)
    }

    /// Fetch rotation metadata of the rotation-tracked secret.
    pub async fn fetch_tracked_metadata(&self) -> Result<RotationMetadata> {
        let location = self.inner.settings.tracked_location();
        self.inner.store.fetch_secret_metadata(&location.name, &location.region).await
    }

    pub(super) async fn lock_refresh(&self) -> MutexGuard<'_, ()> {
        self.inner.refresh_guard.lock().await
    }

    /// The refresh-and-rearm sequence. The guard proves the caller holds the
    /// critical section.
    pub(super) async fn refresh_locked(
        &self,
        _guard: &MutexGuard<'_, ()>,
        trigger: RefreshTrigger,
    ) -> Result<RefreshReport> {
        if self.is_shut_down() {
            return Err(SecretsError::Shutdown);
        }

        let span = info_span!("secret_refresh", trigger = %trigger);
        async move {
            let settings = &self.inner.settings;

            // Metadata first: a rotation landing after this read carries a
            // newer timestamp, so the next drift poll still sees it.
            let metadata = self.fetch_tracked_metadata().await;
            match &metadata {
                Ok(RotationMetadata { last_rotated_at: Some(observed), .. }) => {
                    self.record_rotation_attempt(*observed);
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, kind = err.kind(), "Rotation metadata unavailable"),
            }

            let mut refreshed = Vec::with_capacity(SecretGroup::ALL.len());
            let mut first_error = None;

            for group in SecretGroup::ALL {
                let location = settings.location(group);
                match self.inner.store.fetch_secret_value(&location.name, &location.region).await {
                    Ok(set) => {
                        let key_count = set.len();
                        self.inner.cache.replace(group, set);
                        info!(group = %group, secret = %location.name, key_count, "Refreshed secret set");
                        refreshed.push(group);
                    }
                    Err(err) => {
                        error!(
                            group = %group,
                            secret = %location.name,
                            error = %err,
                            kind = err.kind(),
                            "Failed to refresh secret set, keeping cached values"
                        );
                        first_error.get_or_insert(err);
                    }
                }
            }

            // Only a refreshed tracked set may move the rotation state forward.
            let rotation_advanced = match (&metadata, refreshed.contains(&settings.rotation_tracked)) {
                (Ok(RotationMetadata { last_rotated_at: Some(observed), .. }), true) => {
                    self.advance_rotation(*observed)
                }
                _ => false,
            };

            let decision = match &first_error {
                Some(_) => settings.policy.retry_after_failure(),
                None => settings.policy.decide(
                    metadata.as_ref().ok().and_then(|m| m.next_rotation_at),
                    Utc::now(),
                ),
            };
            self.arm(decision);

            let completed_at = Utc::now();
            let succeeded = first_error.is_none();
            self.inner.metrics.record_secret_refresh(trigger.as_str(), succeeded);
            self.inner.status_tx.send_modify(|status| {
                status.last_trigger = Some(trigger);
                status.last_attempt_at = Some(completed_at);
                match &first_error {
                    Some(err) => status.last_error = Some(err.to_string()),
                    None => {
                        status.generation += 1;
                        status.last_success_at = Some(completed_at);
                        status.last_error = None;
                    }
                }
            });

            if let Some(err) = first_error {
                return Err(err);
            }

            self.inner.metrics.set_last_refresh_timestamp(completed_at.timestamp());
            Ok(RefreshReport {
                trigger,
                refreshed,
                rotation_advanced,
                last_known_rotation: self.rotation_state().last_known_rotation(),
                next_delay_ms: decision.delay.as_millis() as u64,
                next_reason: decision.reason,
                completed_at,
            })
        }
        .instrument(span)
        .await
    }

    fn record_rotation_attempt(&self, observed: DateTime<Utc>) {
        self.inner.rotation.write().unwrap_or_else(PoisonError::into_inner).record_attempt(observed);
    }

    fn advance_rotation(&self, observed: DateTime<Utc>) -> bool {
        let mut state = self.inner.rotation.write().unwrap_or_else(PoisonError::into_inner);
        let previous = state.last_known_rotation();
        let advanced = state.advance(observed);
        if advanced {
            info!(last_rotated_at = %observed, previous = ?previous, "Recorded secret rotation");
        }
        advanced
    }

    fn arm(&self, decision: ScheduleDecision) {
        let manager = self.downgrade();
        let armed = self
            .inner
            .timer
            .arm(decision, move |generation| fire_scheduled_refresh(manager, generation));

        match armed {
            Some(armed) => {
                self.inner.metrics.record_refresh_timer_armed(
                    decision.delay,
                    decision.reason.as_str(),
                    armed.replaced_previous,
                );
                info!(
                    generation = armed.generation,
                    delay_ms = decision.delay.as_millis() as u64,
                    reason = decision.reason.as_str(),
                    "Armed next secret refresh"
                );
            }
            None => debug!("Refresh timer shut down, not arming"),
        }
    }

    /// Stop the drift poller and cancel the armed timer.
    ///
    /// An in-flight refresh completes but does not rearm.
    pub fn shutdown(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        info!("Shutting down secret lifecycle manager");
        self.inner.shutdown.cancel();
        self.inner.timer.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn cache(&self) -> Arc<SecretCache> {
        Arc::clone(&self.inner.cache)
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.inner.settings
    }

    pub fn backend_name(&self) -> &'static str {
        self.inner.store.backend_name()
    }

    pub fn rotation_state(&self) -> RotationState {
        *self.inner.rotation.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.inner.timer.state()
    }

    /// Arm and cancel totals of the refresh timer.
    pub fn timer_counts(&self) -> (u64, u64) {
        (self.inner.timer.armed_count(), self.inner.timer.cancelled_count())
    }

    pub fn status(&self) -> RefreshStatus {
        self.inner.status_tx.borrow().clone()
    }

    /// Receive the latest [`RefreshStatus`] after every refresh cycle.
    pub fn subscribe(&self) -> watch::Receiver<RefreshStatus> {
        self.inner.status_tx.subscribe()
    }

    pub(super) fn metrics(&self) -> MetricsRecorder {
        self.inner.metrics
    }
}

fn fire_scheduled_refresh(manager: WeakSecretManager, generation: u64) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let Some(manager) = manager.upgrade() else {
            return;
        };

        let guard = manager.lock_refresh().await;
        if !manager.inner.timer.begin_fire(generation) {
            debug!(generation, "Scheduled refresh superseded");
            return;
        }

        if let Err(err) = manager.refresh_locked(&guard, RefreshTrigger::Scheduled).await {
            warn!(error = %err, kind = err.kind(), "Scheduled secret refresh failed");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::memory::InMemorySecretStore;

    const APP: &str = "employee-api-secrets";
    const DB: &str = "employee-api-db-credentials";

    fn seeded_store() -> Arc<InMemorySecretStore> {
        let store = Arc::new(InMemorySecretStore::new());
        store.put_secret(APP, [("API_KEY", "app-1")]);
        store.put_secret(DB, [("username", "svc"), ("password", "pw-1")]);
        store
    }

    fn manager(store: &Arc<InMemorySecretStore>) -> SecretManager {
        SecretManager::new(store.clone(), LifecycleSettings::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_load_populates_cache_and_arms_fallback() {
        let store = seeded_store();
        let manager = manager(&store);

        let report = manager.refresh_and_rearm(RefreshTrigger::Initial).await.unwrap();

        assert_eq!(report.refreshed, vec![SecretGroup::AppConfig, SecretGroup::Database]);
        assert_eq!(report.next_reason, ScheduleReason::MetadataUnavailable);
        assert_eq!(report.next_delay_ms, 300_000);
        assert_eq!(manager.cache().get("password").unwrap().reveal(), "pw-1");
        assert!(matches!(manager.scheduler_state(), SchedulerState::Armed { .. }));
        assert_eq!(manager.status().generation, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_values() {
        let store = seeded_store();
        let manager = manager(&store);
        manager.refresh_and_rearm(RefreshTrigger::Initial).await.unwrap();

        store.put_secret(DB, [("username", "svc"), ("password", "pw-2")]);
        store.fail_value_fetches(DB, Some(SecretsError::store_unavailable("connection reset")));

        let err = manager.trigger_immediate_refresh().await.unwrap_err();
        assert!(matches!(err, SecretsError::StoreUnavailable { .. }));
        assert_eq!(manager.cache().get("password").unwrap().reveal(), "pw-1");
        assert!(matches!(
            manager.scheduler_state(),
            SchedulerState::Armed { reason: ScheduleReason::RetryAfterFailure, .. }
        ));

        let status = manager.status();
        assert_eq!(status.generation, 1);
        assert!(status.last_error.is_some());
        assert!(!status.is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_not_advanced_when_tracked_set_fails() {
        let store = seeded_store();
        let rotated = Utc::now() - chrono::Duration::minutes(5);
        store.set_metadata(DB, RotationMetadata::new(Some(rotated), None));
        store.fail_value_fetches(DB, Some(SecretsError::not_found(DB)));
        let manager = manager(&store);

        assert!(manager.refresh_and_rearm(RefreshTrigger::Initial).await.is_err());
        assert_eq!(manager.rotation_state().last_known_rotation(), None);

        store.fail_value_fetches(DB, None);
        let report = manager.trigger_immediate_refresh().await.unwrap();
        assert!(report.rotation_advanced);
        assert_eq!(manager.rotation_state().last_known_rotation(), Some(rotated));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_next_uses_metadata() {
        let store = seeded_store();
        store.set_metadata(
            DB,
            RotationMetadata::new(None, Some(Utc::now() + chrono::Duration::hours(1))),
        );
        let manager = manager(&store);

        let decision = manager.schedule_next().await.unwrap();
        assert_eq!(decision.reason, ScheduleReason::NextRotation);
        assert!(decision.delay > Duration::from_secs(3590));
        assert_eq!(store.value_fetches(DB), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_timer_and_rejects_refresh() {
        let store = seeded_store();
        let manager = manager(&store);
        manager.refresh_and_rearm(RefreshTrigger::Initial).await.unwrap();

        manager.shutdown();

        assert_eq!(manager.scheduler_state(), SchedulerState::Idle);
        assert_eq!(manager.trigger_immediate_refresh().await.unwrap_err(), SecretsError::Shutdown);
        assert_eq!(manager.schedule_next().await.unwrap_err(), SecretsError::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_each_cycle() {
        let store = seeded_store();
        let manager = manager(&store);
        let mut status = manager.subscribe();

        manager.refresh_and_rearm(RefreshTrigger::Initial).await.unwrap();
        status.changed().await.unwrap();
        assert_eq!(status.borrow_and_update().last_trigger, Some(RefreshTrigger::Initial));

        manager.trigger_immediate_refresh().await.unwrap();
        status.changed().await.unwrap();
        let latest = status.borrow_and_update().clone();
        assert_eq!(latest.last_trigger, Some(RefreshTrigger::Manual));
        assert_eq!(latest.generation, 2);
    }
}
