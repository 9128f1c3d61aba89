//! Persistence of check and notification history

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreResult;
use crate::types::{CheckOutcome, DomainId, NotificationRecord};

/// Append-only check history
#[async_trait]
pub trait CheckHistoryRepository: Send + Sync {
    /// Append one check outcome
    async fn save_check(&self, outcome: &CheckOutcome) -> CoreResult<()>;

    /// Most recent outcomes for a domain, newest first
    async fn recent_checks(&self, domain_id: DomainId, limit: u64)
        -> CoreResult<Vec<CheckOutcome>>;

    /// Delete outcomes older than `cutoff`, returning how many were removed
    async fn prune_checks_before(&self, cutoff: DateTime<Utc>) -> CoreResult<u64>;
}

/// Append-only notification history
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Append one notification outcome
    async fn save_notification(&self, record: &NotificationRecord) -> CoreResult<()>;

    /// Most recent notifications for a domain, newest first
    async fn recent_notifications(
        &self,
        domain_id: DomainId,
        limit: u64,
    ) -> CoreResult<Vec<NotificationRecord>>;

    /// Number of successful notifications sent at or after `since`
    async fn count_notifications_since(&self, since: DateTime<Utc>) -> CoreResult<u64>;
}
