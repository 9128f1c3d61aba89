//! Collaborator abstraction trait definitions

mod domain_repository;
mod existence_probe;
mod history_repository;
mod notification_transport;

pub use domain_repository::DomainRepository;
pub use existence_probe::ExistenceProbe;
pub use history_repository::{CheckHistoryRepository, NotificationRepository};
pub use notification_transport::NotificationTransport;
