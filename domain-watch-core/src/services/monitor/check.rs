//! The check pipeline shared by sweep, watch and manual checks.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Utc;

use crate::error::CoreResult;
use crate::services::reconciler::reconcile;
use crate::services::state_machine::apply_verdict;
use crate::types::{
    CheckOutcome, CheckPath, CheckReport, CheckRun, DomainId, DomainNotice, DomainRecord,
    NotificationKind, SkipReason, Transition, Verdict,
};

use super::Monitor;

impl Monitor {
    /// Run one check for `domain_id` under its execution lock.
    ///
    /// The lock is held from before probing until the outcome is persisted
    /// and dropped on every return path.
    pub(super) async fn check_domain(
        self: &Arc<Self>,
        domain_id: DomainId,
        path: CheckPath,
    ) -> CoreResult<CheckRun> {
        // Shutdown waits for every holder before the notification queue drains.
        let _in_flight = self.check_gate.read().await;
        if self.is_shutting_down() {
            return Ok(CheckRun::Skipped(SkipReason::ShuttingDown));
        }

        let Some(_guard) = self
            .locks
            .try_acquire(domain_id, self.config.lock_wait)
            .await
        else {
            if path != CheckPath::Manual {
                self.skipped_checks.fetch_add(1, Ordering::Relaxed);
                log::warn!("Skipped {path} check of domain {domain_id}: lock contended");
            }
            return Ok(CheckRun::Skipped(SkipReason::LockContended));
        };

        // Reload under the lock so the state machine sees the latest status.
        let Some(mut domain) = self.ctx.domain_repository.find_by_id(domain_id).await? else {
            return Ok(CheckRun::Skipped(SkipReason::Missing));
        };
        if path != CheckPath::Manual && !domain.is_active {
            return Ok(CheckRun::Skipped(SkipReason::Inactive));
        }

        let pair = self.resolvers.probe(&domain.name).await;
        let verdict = reconcile(&pair.primary.outcome, &pair.secondary.outcome);
        let now = Utc::now();
        let (state, transition) = apply_verdict(&domain.state(), verdict, now);

        self.ctx
            .domain_repository
            .apply_status(domain_id, &state)
            .await?;
        domain.set_state(state);
        domain.updated_at = now;

        let outcome = CheckOutcome {
            domain_id,
            verdict,
            path,
            latency_ms: pair.latency_ms(),
            error: pair.error_detail(),
            notification_triggered: transition == Transition::BecameAvailable,
            checked_at: now,
        };

        match verdict {
            Verdict::Error => log::warn!(
                "[{path}] {}: inconclusive ({})",
                domain.name,
                outcome.error.as_deref().unwrap_or("unknown")
            ),
            Verdict::Available | Verdict::Unavailable => log::debug!(
                "[{path}] {}: {verdict} in {}ms",
                domain.name,
                outcome.latency_ms
            ),
        }

        // The transition is committed; its effects must not depend on the
        // history write below.
        self.apply_effects(&domain, transition, verdict, path);

        self.ctx.check_repository.save_check(&outcome).await?;

        Ok(CheckRun::Completed(Box::new(CheckReport {
            domain,
            primary: pair.primary,
            secondary: pair.secondary,
            outcome,
            transition,
        })))
    }

    fn apply_effects(
        self: &Arc<Self>,
        domain: &DomainRecord,
        transition: Transition,
        verdict: Verdict,
        path: CheckPath,
    ) {
        match transition {
            Transition::BecameAvailable => {
                log::info!(
                    "[{path}] {} is AVAILABLE (was {})",
                    domain.name,
                    domain.previous_status
                );
                self.notices.enqueue(DomainNotice::for_domain(
                    NotificationKind::Available,
                    domain,
                    Utc::now(),
                ));
                self.promote(domain.id);
            }
            Transition::BecameUnavailable { from } => {
                log::info!("[{path}] {} is now unavailable (was {from})", domain.name);
                if transition.is_reregistration() && self.config.notify_on_lost {
                    self.notices.enqueue(DomainNotice::for_domain(
                        NotificationKind::Lost,
                        domain,
                        Utc::now(),
                    ));
                }
            }
            Transition::NoOp => {
                if path == CheckPath::Manual
                    && verdict == Verdict::Available
                    && self.config.confirm_manual_immediately
                {
                    self.promote(domain.id);
                }
            }
            Transition::Errored => {}
        }

        if verdict == Verdict::Unavailable && self.stop_watch(domain.id) {
            log::info!("Watch on {} ended: domain is unavailable", domain.name);
        }
    }
}
