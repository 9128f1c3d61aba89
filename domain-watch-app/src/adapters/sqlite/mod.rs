//! SQLite-based unified store using `SeaORM`.
//!
//! A single `SqliteStore` implements `DomainRepository`, `CheckHistoryRepository`
//! and `NotificationRepository`, backed by a local `SQLite` database.
//! Check and notification history rows are removed together with their domain.

mod domain_repo;
pub(crate) mod entity;
mod history_repo;
mod migration;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use domain_watch_core::error::{CoreError, CoreResult};
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use migration::Migrator;

/// SQLite-based store for the monitor daemon.
pub struct SqliteStore {
    /// Shared `SeaORM` database connection.
    pub(crate) db: DatabaseConnection,
}

impl SqliteStore {
    /// Create a new `SQLite` store.
    ///
    /// - `db_path`: Path to the `SQLite` database file (created if not exists).
    ///
    /// # Errors
    /// Returns `CoreError::StorageError` if directory creation, database
    /// connection, or schema migration fails.
    pub async fn new(db_path: &Path) -> CoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::StorageError(format!("Failed to create directory: {e}")))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let db = Database::connect(&db_url)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to connect to SQLite: {e}")))?;

        let store = Self { db };

        // Ensure schema is up to date before the store is used.
        Migrator::up(&store.db, None)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to run migrations: {e}")))?;

        log::info!("SQLite store ready at {}", db_path.display());
        Ok(store)
    }
}

/// Fixed-width UTC timestamp, so stored values sort chronologically as text.
pub(crate) fn to_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(field: &str, value: &str) -> CoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::SerializationError(format!("Invalid {field}: {e}")))
}

pub(crate) fn parse_optional_timestamp(
    field: &str,
    value: Option<&str>,
) -> CoreResult<Option<DateTime<Utc>>> {
    value.map(|v| parse_timestamp(field, v)).transpose()
}
