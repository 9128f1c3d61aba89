//! Check and notification history for `SqliteStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{NotSet, Set},
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use domain_watch_core::error::{CoreError, CoreResult};
use domain_watch_core::traits::{CheckHistoryRepository, NotificationRepository};
use domain_watch_core::types::{CheckOutcome, DomainId, NotificationRecord};

use super::entity::{check_log, notification};
use super::{SqliteStore, parse_timestamp, to_timestamp};

impl check_log::Model {
    fn into_outcome(self) -> CoreResult<CheckOutcome> {
        Ok(CheckOutcome {
            domain_id: self.domain_id,
            verdict: self.verdict.parse().map_err(CoreError::SerializationError)?,
            path: self.path.parse().map_err(CoreError::SerializationError)?,
            latency_ms: u64::try_from(self.latency_ms).unwrap_or_default(),
            error: self.error,
            notification_triggered: self.notification_triggered,
            checked_at: parse_timestamp("checked_at", &self.checked_at)?,
        })
    }
}

impl notification::Model {
    fn into_record(self) -> CoreResult<NotificationRecord> {
        Ok(NotificationRecord {
            domain_id: self.domain_id,
            kind: self.kind.parse().map_err(CoreError::SerializationError)?,
            http_status: self.http_status.and_then(|s| u16::try_from(s).ok()),
            success: self.success,
            response: self.response,
            attempts: u32::try_from(self.attempts).unwrap_or_default(),
            sent_at: parse_timestamp("sent_at", &self.sent_at)?,
        })
    }
}

#[async_trait]
impl CheckHistoryRepository for SqliteStore {
    async fn save_check(&self, outcome: &CheckOutcome) -> CoreResult<()> {
        let active_model = check_log::ActiveModel {
            id: NotSet,
            domain_id: Set(outcome.domain_id),
            verdict: Set(outcome.verdict.as_str().to_string()),
            path: Set(outcome.path.as_str().to_string()),
            latency_ms: Set(i64::try_from(outcome.latency_ms).unwrap_or(i64::MAX)),
            error: Set(outcome.error.clone()),
            notification_triggered: Set(outcome.notification_triggered),
            checked_at: Set(to_timestamp(outcome.checked_at)),
        };

        active_model
            .insert(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to save check log: {e}")))?;
        Ok(())
    }

    async fn recent_checks(
        &self,
        domain_id: DomainId,
        limit: u64,
    ) -> CoreResult<Vec<CheckOutcome>> {
        let rows = check_log::Entity::find()
            .filter(check_log::Column::DomainId.eq(domain_id))
            .order_by_desc(check_log::Column::CheckedAt)
            .order_by_desc(check_log::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query check logs: {e}")))?;

        rows.into_iter().map(check_log::Model::into_outcome).collect()
    }

    async fn prune_checks_before(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let result = check_log::Entity::delete_many()
            .filter(check_log::Column::CheckedAt.lt(to_timestamp(cutoff)))
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to prune check logs: {e}")))?;

        Ok(result.rows_affected)
    }
}

#[async_trait]
impl NotificationRepository for SqliteStore {
    async fn save_notification(&self, record: &NotificationRecord) -> CoreResult<()> {
        let active_model = notification::ActiveModel {
            id: NotSet,
            domain_id: Set(record.domain_id),
            kind: Set(record.kind.as_str().to_string()),
            http_status: Set(record.http_status.map(i32::from)),
            success: Set(record.success),
            response: Set(record.response.clone()),
            attempts: Set(i32::try_from(record.attempts).unwrap_or(i32::MAX)),
            sent_at: Set(to_timestamp(record.sent_at)),
        };

        active_model
            .insert(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to save notification: {e}")))?;
        Ok(())
    }

    async fn recent_notifications(
        &self,
        domain_id: DomainId,
        limit: u64,
    ) -> CoreResult<Vec<NotificationRecord>> {
        let rows = notification::Entity::find()
            .filter(notification::Column::DomainId.eq(domain_id))
            .order_by_desc(notification::Column::SentAt)
            .order_by_desc(notification::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| {
                CoreError::StorageError(format!("Failed to query notifications: {e}"))
            })?;

        rows.into_iter().map(notification::Model::into_record).collect()
    }

    async fn count_notifications_since(&self, since: DateTime<Utc>) -> CoreResult<u64> {
        notification::Entity::find()
            .filter(notification::Column::Success.eq(true))
            .filter(notification::Column::SentAt.gte(to_timestamp(since)))
            .count(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to count notifications: {e}")))
    }
}
