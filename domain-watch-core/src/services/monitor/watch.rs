//! Fast watch mode around a suspected availability event.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{DateTime, Utc};
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::services::shutdown::stopped;
use crate::types::{CheckPath, CheckRun, DomainId, SkipReason, Verdict};

use super::Monitor;

/// In-memory bookkeeping of one watched domain
#[derive(Debug, Clone)]
pub(super) struct WatchEntry {
    generation: u64,
    entered_at: DateTime<Utc>,
    deadline: Instant,
    probes: u32,
}

/// Why a watch loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchEnd {
    Ceiling,
    Inactive,
    Shutdown,
}

impl Monitor {
    /// Put a domain under watch.
    ///
    /// Returns `false` if it already was; the running loop is left alone.
    pub(super) fn promote(self: &Arc<Self>, domain_id: DomainId) -> bool {
        if self.is_shutting_down() {
            return false;
        }
        let generation = {
            let mut watches = self.lock_watches();
            if watches.contains_key(&domain_id) {
                return false;
            }
            let generation = self.watch_generation.fetch_add(1, Ordering::Relaxed);
            watches.insert(
                domain_id,
                WatchEntry {
                    generation,
                    entered_at: Utc::now(),
                    deadline: Instant::now() + self.config.watch_max_duration,
                    probes: 0,
                },
            );
            generation
        };

        log::info!(
            "Domain {domain_id} under watch (every {:?}, at most {} probes or {:?})",
            self.config.watch_interval,
            self.config.watch_max_probes,
            self.config.watch_max_duration
        );
        self.spawn_tracked(Arc::clone(self).run_watch(domain_id, generation));
        true
    }

    /// Remove a domain's watch entry; its loop exits at the next tick.
    pub(super) fn stop_watch(&self, domain_id: DomainId) -> bool {
        self.lock_watches().remove(&domain_id).is_some()
    }

    /// Remove the entry only if it still belongs to this loop
    fn end_watch(&self, domain_id: DomainId, generation: u64, reason: WatchEnd) {
        let mut watches = self.lock_watches();
        if watches
            .get(&domain_id)
            .is_some_and(|entry| entry.generation == generation)
        {
            if let Some(entry) = watches.remove(&domain_id) {
                let watched_for = Utc::now() - entry.entered_at;
                log::info!(
                    "Watch on domain {domain_id} ended ({reason:?}) after {} probe(s), {}s",
                    entry.probes,
                    watched_for.num_seconds()
                );
            }
        }
    }

    /// Whether this loop should run another probe
    fn watch_may_continue(&self, domain_id: DomainId, generation: u64) -> Option<bool> {
        let watches = self.lock_watches();
        let entry = watches.get(&domain_id)?;
        if entry.generation != generation {
            return None;
        }
        Some(entry.probes < self.config.watch_max_probes && Instant::now() < entry.deadline)
    }

    fn count_watch_probe(&self, domain_id: DomainId, generation: u64) {
        if let Some(entry) = self
            .lock_watches()
            .get_mut(&domain_id)
            .filter(|entry| entry.generation == generation)
        {
            entry.probes += 1;
        }
    }

    async fn run_watch(self: Arc<Self>, domain_id: DomainId, generation: u64) {
        let mut shutdown = self.shutdown.subscribe();
        let period = self.config.watch_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = stopped(&mut shutdown) => {
                    self.end_watch(domain_id, generation, WatchEnd::Shutdown);
                    return;
                }
            }

            match self.watch_may_continue(domain_id, generation) {
                // Entry removed or replaced elsewhere
                None => return,
                Some(false) => {
                    self.end_watch(domain_id, generation, WatchEnd::Ceiling);
                    return;
                }
                Some(true) => {}
            }

            self.pacer.wait().await;
            let Ok(_permit) = self.permits.acquire().await else {
                return;
            };

            match self.check_domain(domain_id, CheckPath::Watch).await {
                Ok(CheckRun::Completed(report)) => {
                    self.count_watch_probe(domain_id, generation);
                    // Unavailable already removed the entry in the check effects
                    if report.outcome.verdict == Verdict::Unavailable {
                        return;
                    }
                }
                Ok(CheckRun::Skipped(SkipReason::Inactive | SkipReason::Missing)) => {
                    self.end_watch(domain_id, generation, WatchEnd::Inactive);
                    return;
                }
                Ok(CheckRun::Skipped(SkipReason::ShuttingDown)) => {
                    self.end_watch(domain_id, generation, WatchEnd::Shutdown);
                    return;
                }
                Ok(CheckRun::Skipped(SkipReason::LockContended | SkipReason::UnderWatch)) => {}
                Err(e) => {
                    self.count_watch_probe(domain_id, generation);
                    if e.is_expected() {
                        log::warn!("Watch check of domain {domain_id} failed: {e}");
                    } else {
                        log::error!("Watch check of domain {domain_id} failed: {e}");
                    }
                }
            }
        }
    }
}
