//! `DomainRepository` implementation for `SqliteStore`.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{NotSet, Set},
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
    TransactionTrait,
};

use domain_watch_core::error::{CoreError, CoreResult};
use domain_watch_core::traits::DomainRepository;
use domain_watch_core::types::{
    DomainCounts, DomainId, DomainRecord, DomainState, DomainStatus, NewDomain,
};

use super::entity::{check_log, domain, notification};
use super::{SqliteStore, parse_optional_timestamp, parse_timestamp, to_timestamp};

impl domain::Model {
    /// Convert a `SeaORM` row model into a `DomainRecord`.
    ///
    /// String-backed fields are parsed into strongly typed values.
    fn into_record(self) -> CoreResult<DomainRecord> {
        let status = self.status.parse().map_err(CoreError::SerializationError)?;
        let previous_status = self
            .previous_status
            .parse()
            .map_err(CoreError::SerializationError)?;

        Ok(DomainRecord {
            id: self.id,
            extension: self.extension,
            niche: self.niche,
            traffic: u64::try_from(self.traffic).unwrap_or_default(),
            referring_domains: u64::try_from(self.referring_domains).unwrap_or_default(),
            status,
            previous_status,
            last_checked: parse_optional_timestamp("last_checked", self.last_checked.as_deref())?,
            last_available: parse_optional_timestamp(
                "last_available",
                self.last_available.as_deref(),
            )?,
            is_active: self.is_active,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            name: self.name,
        })
    }
}

fn to_stored_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl DomainRepository for SqliteStore {
    async fn find_all(&self) -> CoreResult<Vec<DomainRecord>> {
        let rows = domain::Entity::find()
            .order_by_asc(domain::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query domains: {e}")))?;

        rows.into_iter().map(domain::Model::into_record).collect()
    }

    async fn find_active(&self) -> CoreResult<Vec<DomainRecord>> {
        let rows = domain::Entity::find()
            .filter(domain::Column::IsActive.eq(true))
            .order_by_asc(domain::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| {
                CoreError::StorageError(format!("Failed to query active domains: {e}"))
            })?;

        rows.into_iter().map(domain::Model::into_record).collect()
    }

    async fn find_by_id(&self, id: DomainId) -> CoreResult<Option<DomainRecord>> {
        let row = domain::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query domain: {e}")))?;

        row.map(domain::Model::into_record).transpose()
    }

    async fn find_by_name(&self, name: &str) -> CoreResult<Option<DomainRecord>> {
        let row = domain::Entity::find()
            .filter(domain::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query domain: {e}")))?;

        row.map(domain::Model::into_record).transpose()
    }

    async fn insert(&self, new_domain: &NewDomain) -> CoreResult<DomainRecord> {
        let now = to_timestamp(Utc::now());
        let unknown = DomainStatus::Unknown.as_str();

        let active_model = domain::ActiveModel {
            id: NotSet,
            name: Set(new_domain.name.clone()),
            extension: Set(new_domain.extension.clone()),
            niche: Set(new_domain.niche.clone()),
            traffic: Set(to_stored_count(new_domain.traffic)),
            referring_domains: Set(to_stored_count(new_domain.referring_domains)),
            status: Set(unknown.to_string()),
            previous_status: Set(unknown.to_string()),
            last_checked: Set(None),
            last_available: Set(None),
            is_active: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                CoreError::DomainAlreadyExists(new_domain.name.clone())
            } else {
                CoreError::StorageError(format!("Failed to insert domain: {e}"))
            }
        })?;

        model.into_record()
    }

    async fn delete(&self, id: DomainId) -> CoreResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to begin transaction: {e}")))?;

        // History goes first; the cascade only applies when foreign keys are enforced.
        check_log::Entity::delete_many()
            .filter(check_log::Column::DomainId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to delete check logs: {e}")))?;
        notification::Entity::delete_many()
            .filter(notification::Column::DomainId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| {
                CoreError::StorageError(format!("Failed to delete notifications: {e}"))
            })?;
        let result = domain::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to delete domain: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to commit delete: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    async fn set_active(&self, id: DomainId, active: bool) -> CoreResult<()> {
        let changes = domain::ActiveModel {
            is_active: Set(active),
            updated_at: Set(to_timestamp(Utc::now())),
            ..Default::default()
        };
        self.update_domain(id, changes, "monitoring flag").await
    }

    async fn apply_status(&self, id: DomainId, state: &DomainState) -> CoreResult<()> {
        let changes = domain::ActiveModel {
            status: Set(state.status.as_str().to_string()),
            previous_status: Set(state.previous_status.as_str().to_string()),
            last_checked: Set(state.last_checked.map(to_timestamp)),
            last_available: Set(state.last_available.map(to_timestamp)),
            updated_at: Set(to_timestamp(Utc::now())),
            ..Default::default()
        };
        self.update_domain(id, changes, "status").await
    }

    async fn counts(&self) -> CoreResult<DomainCounts> {
        let total = domain::Entity::find()
            .count(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to count domains: {e}")))?;
        let active = domain::Entity::find()
            .filter(domain::Column::IsActive.eq(true))
            .count(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to count domains: {e}")))?;

        let rows: Vec<(String, String)> = domain::Entity::find()
            .select_only()
            .column(domain::Column::Status)
            .column(domain::Column::Extension)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to count domains: {e}")))?;

        let mut counts = DomainCounts {
            total,
            active,
            ..DomainCounts::default()
        };
        for (status, extension) in rows {
            *counts.by_status.entry(status).or_default() += 1;
            *counts.by_extension.entry(extension).or_default() += 1;
        }
        Ok(counts)
    }
}

impl SqliteStore {
    /// Apply the `Set` fields of `changes` to one domain row.
    async fn update_domain(
        &self,
        id: DomainId,
        changes: domain::ActiveModel,
        what: &str,
    ) -> CoreResult<()> {
        let result = domain::Entity::update_many()
            .set(changes)
            .filter(domain::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to update domain {what}: {e}")))?;

        if result.rows_affected == 0 {
            return Err(CoreError::DomainNotFound(id));
        }
        Ok(())
    }
}
