//! Engine services

mod domain_service;
mod execution_lock;
mod hickory_probe;
mod monitor;
mod notifier;
mod reconciler;
mod resolver_pair;
mod shutdown;
mod state_machine;

pub use domain_service::{DomainService, normalize_domain};
pub use execution_lock::{CheckGuard, ExecutionLocks};
pub use hickory_probe::HickoryProbe;
pub use monitor::{Monitor, MonitorConfig, MonitorHandle};
pub use notifier::{NotificationDispatcher, NotificationQueue, RetryPolicy};
pub use reconciler::reconcile;
pub use resolver_pair::{PairReport, ResolverPair};
pub use state_machine::apply_verdict;

use std::sync::Arc;

use crate::traits::{CheckHistoryRepository, DomainRepository, NotificationRepository};

/// Service context holding every storage dependency
///
/// The application layer builds it and injects its storage adapters.
pub struct ServiceContext {
    /// Domain repository
    pub domain_repository: Arc<dyn DomainRepository>,
    /// Check history repository
    pub check_repository: Arc<dyn CheckHistoryRepository>,
    /// Notification history repository
    pub notification_repository: Arc<dyn NotificationRepository>,
}

impl ServiceContext {
    /// Create a service context
    #[must_use]
    pub fn new(
        domain_repository: Arc<dyn DomainRepository>,
        check_repository: Arc<dyn CheckHistoryRepository>,
        notification_repository: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            domain_repository,
            check_repository,
            notification_repository,
        }
    }

    /// Build a context from one store implementing every repository trait
    #[must_use]
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: DomainRepository + CheckHistoryRepository + NotificationRepository + 'static,
    {
        Self::new(store.clone(), store.clone(), store)
    }
}
