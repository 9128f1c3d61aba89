//! Periodic sweep over every active domain.

use std::sync::{Arc, PoisonError};
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::error::CoreResult;
use crate::services::shutdown::stopped;
use crate::types::{CheckPath, CheckRun, SkipReason, SweepSummary, Transition, Verdict};

use super::Monitor;

/// Clears the in-progress flag however the sweep ends
struct SweepGuard<'a>(&'a Monitor);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.sweep_running.store(false, Ordering::Release);
    }
}

impl Monitor {
    pub(super) async fn run_sweep_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let period = self.config.sweep_interval;
        let first = if self.config.sweep_on_startup {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut ticker = interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = stopped(&mut shutdown) => break,
            }
            self.set_next_sweep(period);

            if self.sweep_running.load(Ordering::Acquire) {
                log::warn!("Previous sweep still running, skipping this tick");
                continue;
            }
            let monitor = Arc::clone(&self);
            self.spawn_tracked(async move {
                if let Err(e) = monitor.sweep_once().await {
                    log::error!("Sweep failed: {e}");
                }
            });
        }
        log::debug!("Sweep loop stopped");
    }

    /// Check every active domain once.
    ///
    /// Returns `None` if another sweep is already running.
    pub(super) async fn sweep_once(self: &Arc<Self>) -> CoreResult<Option<SweepSummary>> {
        if self
            .sweep_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(None);
        }
        let _running = SweepGuard(self);

        let started = Instant::now();
        let domains = self.ctx.domain_repository.find_active().await?;
        let mut summary = SweepSummary {
            total: domains.len(),
            ..SweepSummary::default()
        };
        log::info!("Sweep started: {} active domain(s)", summary.total);

        let mut checks = JoinSet::new();
        for domain in domains {
            if self.is_shutting_down() {
                log::info!("Sweep interrupted by shutdown");
                break;
            }
            if self.is_watching(domain.id) {
                summary.skipped += 1;
                log::debug!("Sweep skips {}: {}", domain.name, SkipReason::UnderWatch);
                continue;
            }

            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                break;
            };
            self.pacer.wait().await;

            let monitor = Arc::clone(self);
            checks.spawn(async move {
                let result = monitor.check_domain(domain.id, CheckPath::Sweep).await;
                drop(permit);
                (domain.name, result)
            });
        }

        while let Some(joined) = checks.join_next().await {
            let (name, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    log::error!("Sweep check task failed: {e}");
                    summary.errors += 1;
                    continue;
                }
            };
            match result {
                Ok(CheckRun::Completed(report)) => {
                    summary.checked += 1;
                    match report.outcome.verdict {
                        Verdict::Available => summary.available += 1,
                        Verdict::Error => summary.errors += 1,
                        Verdict::Unavailable => {}
                    }
                    if report.transition == Transition::BecameAvailable {
                        summary.notifications_triggered += 1;
                    }
                }
                Ok(CheckRun::Skipped(_)) => summary.skipped += 1,
                Err(e) => {
                    summary.errors += 1;
                    log::error!("Sweep check of {name} failed: {e}");
                }
            }
        }

        summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        *self
            .last_sweep_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());

        log::info!(
            "Sweep finished: {} total, {} checked, {} skipped, {} available, {} errors, {} notification(s) in {}ms",
            summary.total,
            summary.checked,
            summary.skipped,
            summary.available,
            summary.errors,
            summary.notifications_triggered,
            summary.duration_ms
        );

        self.prune_history().await;
        Ok(Some(summary))
    }

    async fn prune_history(&self) {
        let days = self.config.history_retention_days;
        if days == 0 {
            return;
        }
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        match self.ctx.check_repository.prune_checks_before(cutoff).await {
            Ok(0) => {}
            Ok(removed) => log::info!("Pruned {removed} check(s) older than {days} day(s)"),
            Err(e) => log::error!("Failed to prune check history: {e}"),
        }
    }

    pub(super) fn set_next_sweep(&self, delay: Duration) {
        let next = chrono::Duration::from_std(delay)
            .ok()
            .map(|delta| Utc::now() + delta);
        *self
            .next_sweep_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = next;
    }
}
