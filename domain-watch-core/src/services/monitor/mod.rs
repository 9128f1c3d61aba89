//! Scheduling core
//!
//! [`Monitor`] owns every timer of the engine: the sweep loop over all active
//! domains and one fast loop per domain under watch. All checks go through
//! the same pipeline (execution lock → resolver pair → reconciler → state
//! machine → persistence) and are bounded by a global semaphore and pacer.

mod check;
mod config;
mod pacer;
mod sweep;
mod watch;

pub use config::MonitorConfig;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, Semaphore, mpsc, watch as watch_channel};
use tokio::task::{JoinHandle, JoinSet};

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::services::execution_lock::ExecutionLocks;
use crate::services::notifier::{NotificationDispatcher, NotificationQueue};
use crate::services::resolver_pair::ResolverPair;
use crate::types::{
    CheckPath, CheckReport, CheckRun, DeliveryResponse, DomainId, DomainNotice, DomainStatusView,
    MonitorStats, SkipReason, SweepSummary,
};

use self::pacer::ProbePacer;
use self::watch::WatchEntry;

/// Checks shown in a domain's status view
const RECENT_CHECKS_LIMIT: u64 = 10;

pub struct Monitor {
    ctx: Arc<ServiceContext>,
    config: MonitorConfig,
    resolvers: ResolverPair,
    locks: ExecutionLocks,
    permits: Arc<Semaphore>,
    pacer: ProbePacer,
    watches: Mutex<HashMap<DomainId, WatchEntry>>,
    watch_generation: AtomicU64,
    sweep_running: AtomicBool,
    skipped_checks: AtomicU64,
    last_sweep_at: Mutex<Option<DateTime<Utc>>>,
    next_sweep_at: Mutex<Option<DateTime<Utc>>>,
    dispatcher: Arc<NotificationDispatcher>,
    notices: NotificationQueue,
    pending_notices: Mutex<Option<mpsc::UnboundedReceiver<DomainNotice>>>,
    /// Held shared by every running check
    check_gate: RwLock<()>,
    /// Sweep runs and watch loops
    tasks: Mutex<JoinSet<()>>,
    shutdown: watch_channel::Sender<bool>,
    worker_stop: watch_channel::Sender<bool>,
}

/// Running background tasks of a started [`Monitor`]
pub struct MonitorHandle {
    monitor: Arc<Monitor>,
    sweep_task: JoinHandle<()>,
    notification_worker: JoinHandle<()>,
}

impl MonitorHandle {
    #[must_use]
    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    /// Stop all loops and wait for queued notifications to be delivered.
    ///
    /// The notification worker drains only after every sweep, watch loop
    /// and in-flight check has finished, so no committed transition loses
    /// its notice.
    pub async fn shutdown(self) {
        log::info!("Shutting down monitor");
        self.monitor.shutdown.send_replace(true);

        if let Err(e) = self.sweep_task.await {
            log::error!("Sweep loop ended abnormally: {e}");
        }
        let mut tasks = std::mem::take(&mut *self.monitor.lock_tasks());
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                log::error!("Monitor task ended abnormally: {e}");
            }
        }
        drop(self.monitor.check_gate.write().await);

        self.monitor.worker_stop.send_replace(true);
        if let Err(e) = self.notification_worker.await {
            log::error!("Notification worker ended abnormally: {e}");
        }
        self.monitor.lock_watches().clear();
        log::info!("Monitor stopped");
    }
}

impl Monitor {
    pub fn new(
        ctx: Arc<ServiceContext>,
        config: MonitorConfig,
        resolvers: ResolverPair,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> CoreResult<Arc<Self>> {
        config.validate()?;
        let (notices, receiver) = NotificationQueue::channel();
        let (shutdown, _) = watch_channel::channel(false);
        let (worker_stop, _) = watch_channel::channel(false);

        Ok(Arc::new(Self {
            ctx,
            permits: Arc::new(Semaphore::new(config.max_concurrent_checks)),
            pacer: ProbePacer::new(config.probe_spacing),
            config,
            resolvers,
            locks: ExecutionLocks::new(),
            watches: Mutex::new(HashMap::new()),
            watch_generation: AtomicU64::new(0),
            sweep_running: AtomicBool::new(false),
            skipped_checks: AtomicU64::new(0),
            last_sweep_at: Mutex::new(None),
            next_sweep_at: Mutex::new(None),
            dispatcher,
            notices,
            pending_notices: Mutex::new(Some(receiver)),
            check_gate: RwLock::new(()),
            tasks: Mutex::new(JoinSet::new()),
            shutdown,
            worker_stop,
        }))
    }

    /// Spawn the sweep loop and the notification worker.
    ///
    /// Can only be called once.
    pub fn start(self: &Arc<Self>) -> CoreResult<MonitorHandle> {
        let receiver = self
            .pending_notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| CoreError::ValidationError("Monitor already started".to_string()))?;

        self.set_next_sweep(if self.config.sweep_on_startup {
            Duration::ZERO
        } else {
            self.config.sweep_interval
        });
        let notification_worker =
            Arc::clone(&self.dispatcher).spawn_worker(receiver, self.worker_stop.subscribe());
        let sweep_task = tokio::spawn(Arc::clone(self).run_sweep_loop());

        let (primary, secondary) = self.resolvers.endpoints();
        log::info!(
            "Monitor started (sweep every {:?}, watch every {:?}, resolvers {primary} / {secondary})",
            self.config.sweep_interval,
            self.config.watch_interval
        );

        Ok(MonitorHandle {
            monitor: Arc::clone(self),
            sweep_task,
            notification_worker,
        })
    }

    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Operator-requested check, bypassing the sweep schedule.
    ///
    /// Waits for a slot under `max_concurrent_checks` like scheduled checks.
    /// Fails with `CheckInProgress` when another check holds the domain.
    pub async fn request_manual_check(
        self: &Arc<Self>,
        domain_id: DomainId,
    ) -> CoreResult<CheckReport> {
        self.ensure_running()?;
        let domain = self
            .ctx
            .domain_repository
            .find_by_id(domain_id)
            .await?
            .ok_or(CoreError::DomainNotFound(domain_id))?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CoreError::ShuttingDown)?;
        match self.check_domain(domain_id, CheckPath::Manual).await? {
            CheckRun::Completed(report) => Ok(*report),
            CheckRun::Skipped(SkipReason::Missing) => {
                Err(CoreError::DomainNotFound(domain_id))
            }
            CheckRun::Skipped(SkipReason::ShuttingDown) => Err(CoreError::ShuttingDown),
            CheckRun::Skipped(reason) => {
                log::warn!("Manual check of {} rejected: {reason}", domain.name);
                Err(CoreError::CheckInProgress(domain.name))
            }
        }
    }

    /// Enable or disable monitoring; disabling also ends any active watch
    pub async fn set_monitoring(&self, domain_id: DomainId, enabled: bool) -> CoreResult<()> {
        self.ctx
            .domain_repository
            .set_active(domain_id, enabled)
            .await?;
        if !enabled && self.stop_watch(domain_id) {
            log::info!("Watch on domain {domain_id} ended: monitoring disabled");
        }
        log::info!(
            "Monitoring {} for domain {domain_id}",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Current status of one domain plus its latest checks
    pub async fn domain_status(&self, domain_id: DomainId) -> CoreResult<DomainStatusView> {
        let domain = self
            .ctx
            .domain_repository
            .find_by_id(domain_id)
            .await?
            .ok_or(CoreError::DomainNotFound(domain_id))?;
        let recent_checks = self
            .ctx
            .check_repository
            .recent_checks(domain_id, RECENT_CHECKS_LIMIT)
            .await?;

        Ok(DomainStatusView {
            is_watching: self.is_watching(domain_id),
            domain,
            recent_checks,
        })
    }

    pub async fn stats(&self) -> CoreResult<MonitorStats> {
        let counts = self.ctx.domain_repository.counts().await?;
        let start_of_day = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map_or_else(Utc::now, |midnight| midnight.and_utc());
        let notifications_today = self
            .ctx
            .notification_repository
            .count_notifications_since(start_of_day)
            .await?;

        Ok(MonitorStats {
            counts,
            active_watches: self.lock_watches().len(),
            skipped_checks: self.skipped_checks.load(Ordering::Relaxed),
            last_sweep_at: *self
                .last_sweep_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            next_sweep_at: *self
                .next_sweep_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            notifications_today,
        })
    }

    /// Run one sweep now.
    ///
    /// Returns `None` if a sweep is already in progress.
    pub async fn run_sweep(self: &Arc<Self>) -> CoreResult<Option<SweepSummary>> {
        self.ensure_running()?;
        self.sweep_once().await
    }

    #[must_use]
    pub fn is_watching(&self, domain_id: DomainId) -> bool {
        self.lock_watches().contains_key(&domain_id)
    }

    /// Domain IDs currently under watch, ascending
    #[must_use]
    pub fn watched_domains(&self) -> Vec<DomainId> {
        let mut ids: Vec<DomainId> = self.lock_watches().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Release scheduler state of a deleted domain
    pub fn forget_domain(&self, domain_id: DomainId) {
        if self.stop_watch(domain_id) {
            log::info!("Watch on domain {domain_id} ended: domain deleted");
        }
        self.locks.forget(domain_id);
    }

    /// Send a test notification through the configured transport
    pub async fn send_test_notification(&self) -> CoreResult<DeliveryResponse> {
        self.dispatcher.send_test().await
    }

    fn ensure_running(&self) -> CoreResult<()> {
        if self.is_shutting_down() {
            Err(CoreError::ShuttingDown)
        } else {
            Ok(())
        }
    }

    fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Spawn a background task that shutdown waits for
    fn spawn_tracked<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock_tasks();
        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                log::error!("Monitor task ended abnormally: {e}");
            }
        }
        tasks.spawn(task);
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_watches(&self) -> std::sync::MutexGuard<'_, HashMap<DomainId, WatchEntry>> {
        self.watches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests;
