//! Domain persistence abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{DomainCounts, DomainId, DomainRecord, DomainState, NewDomain};

/// Domain record repository Trait
///
/// Platform implementation:
/// - `SqliteStore` (`SeaORM`, domain-watch-app)
///
/// Status fields are written exclusively through [`DomainRepository::apply_status`],
/// which only the check pipeline calls after the state machine has decided.
#[async_trait]
pub trait DomainRepository: Send + Sync {
    /// Get all domains, ordered by ID
    async fn find_all(&self) -> CoreResult<Vec<DomainRecord>>;

    /// Get monitoring-enabled domains, ordered by ID
    async fn find_active(&self) -> CoreResult<Vec<DomainRecord>>;

    /// Get domain based on ID
    async fn find_by_id(&self, id: DomainId) -> CoreResult<Option<DomainRecord>>;

    /// Get domain based on its normalized name
    async fn find_by_name(&self, name: &str) -> CoreResult<Option<DomainRecord>>;

    /// Insert a new domain with status `unknown` and monitoring enabled
    ///
    /// # Returns
    /// * The stored record, including its assigned ID
    async fn insert(&self, domain: &NewDomain) -> CoreResult<DomainRecord>;

    /// Delete a domain together with its check and notification history
    ///
    /// # Returns
    /// * `true` - a record was deleted
    /// * `false` - no such domain
    async fn delete(&self, id: DomainId) -> CoreResult<bool>;

    /// Enable or disable monitoring
    ///
    /// Returns `CoreError::DomainNotFound` if the domain does not exist.
    async fn set_active(&self, id: DomainId, active: bool) -> CoreResult<()>;

    /// Persist the state machine's output for a domain
    ///
    /// Returns `CoreError::DomainNotFound` if the domain does not exist.
    async fn apply_status(&self, id: DomainId, state: &DomainState) -> CoreResult<()>;

    /// Count domains (total, active, by status, by extension)
    async fn counts(&self) -> CoreResult<DomainCounts>;
}
