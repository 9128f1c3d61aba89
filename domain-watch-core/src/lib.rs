//! Domain Watch Core Library
//!
//! Availability detection and escalation engine:
//! - Resolver pair (double DNS existence probe)
//! - Verdict reconciliation and per-domain state machine
//! - Scheduling core (sweep and fast watch) with per-domain execution locks
//! - Notification dispatcher with bounded retries
//!
//! Storage and notification delivery are abstracted through traits; the
//! platform layer (`domain-watch-app`) injects concrete adapters.

pub mod error;
pub mod services;
pub mod traits;
pub mod types;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod test_utils;

// Re-export common types
pub use error::{CoreError, CoreResult};
pub use services::{DomainService, Monitor, MonitorConfig, MonitorHandle, ServiceContext};
pub use traits::{
    CheckHistoryRepository, DomainRepository, ExistenceProbe, NotificationRepository,
    NotificationTransport,
};
