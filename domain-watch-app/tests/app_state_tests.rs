#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for `AppStateBuilder` and the assembled `AppState`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use domain_watch_app::adapters::SqliteStore;
use domain_watch_app::{AppConfig, AppStateBuilder};
use domain_watch_core::error::{CoreError, CoreResult};
use domain_watch_core::traits::{
    CheckHistoryRepository, ExistenceProbe, NotificationRepository, NotificationTransport,
};
use domain_watch_core::types::{
    DeliveryResponse, DomainNotice, DomainStatus, ProbeOutcome, RegisterDomainRequest,
};

async fn create_test_sqlite_store() -> (Arc<SqliteStore>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let db_path = tmp.path().join("test.db");
    let store = SqliteStore::new(&db_path)
        .await
        .expect("failed to create SqliteStore");
    (Arc::new(store), tmp)
}

// ===== Mock Implementations =====

/// Probe that always answers the same way.
struct FixedProbe {
    endpoint: &'static str,
    outcome: ProbeOutcome,
}

#[async_trait]
impl ExistenceProbe for FixedProbe {
    fn endpoint(&self) -> &str {
        self.endpoint
    }

    async fn probe(&self, _domain: &str) -> ProbeOutcome {
        self.outcome.clone()
    }
}

/// Transport that accepts everything and counts deliveries.
#[derive(Default)]
struct CountingTransport {
    sent: AtomicUsize,
}

#[async_trait]
impl NotificationTransport for CountingTransport {
    async fn send(&self, _notice: &DomainNotice) -> CoreResult<DeliveryResponse> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(DeliveryResponse::ok(204))
    }
}

fn fixed_probes(outcome: &ProbeOutcome) -> (Arc<dyn ExistenceProbe>, Arc<dyn ExistenceProbe>) {
    (
        Arc::new(FixedProbe {
            endpoint: "primary:53",
            outcome: outcome.clone(),
        }),
        Arc::new(FixedProbe {
            endpoint: "secondary:53",
            outcome: outcome.clone(),
        }),
    )
}

fn request(domain: &str) -> RegisterDomainRequest {
    RegisterDomainRequest {
        domain: domain.to_string(),
        niche: None,
        traffic: 100,
        referring_domains: 3,
    }
}

// ===== Builder validation =====

#[test]
fn build_without_repositories_fails() {
    let result = AppStateBuilder::new(AppConfig::default())
        .transport(Arc::new(CountingTransport::default()))
        .build();

    assert!(matches!(result, Err(CoreError::ValidationError(_))));
}

#[tokio::test]
async fn build_without_webhook_url_fails() {
    let (store, _tmp) = create_test_sqlite_store().await;
    let (primary, secondary) = fixed_probes(&ProbeOutcome::Exists);

    let result = AppStateBuilder::new(AppConfig::default())
        .store(store)
        .probes(primary, secondary)
        .build();

    assert!(matches!(result, Err(CoreError::ConfigError(_))));
}

#[tokio::test]
async fn build_rejects_invalid_config() {
    let (store, _tmp) = create_test_sqlite_store().await;
    let mut config = AppConfig::default();
    config.monitor.watch_interval_secs = config.monitor.sweep_interval_secs;

    let result = AppStateBuilder::new(config)
        .store(store)
        .transport(Arc::new(CountingTransport::default()))
        .build();

    assert!(matches!(result, Err(CoreError::ConfigError(_))));
}

#[tokio::test]
async fn build_with_webhook_url_and_default_probes() {
    let (store, _tmp) = create_test_sqlite_store().await;
    let mut config = AppConfig::default();
    config.override_webhook_url(Some("https://discord.com/api/webhooks/1/token".to_string()));

    let state = AppStateBuilder::new(config).store(store).build().unwrap();

    assert!(state.domain_service.list().await.unwrap().is_empty());
    assert!(state.monitor.watched_domains().is_empty());
}

// ===== End-to-end over SQLite =====

#[tokio::test]
async fn manual_check_persists_transition_and_notifies() {
    let (store, _tmp) = create_test_sqlite_store().await;
    let transport = Arc::new(CountingTransport::default());
    let (primary, secondary) = fixed_probes(&ProbeOutcome::Absent);

    let state = AppStateBuilder::new(AppConfig::default())
        .store(Arc::clone(&store))
        .transport(transport.clone())
        .probes(primary, secondary)
        .build()
        .unwrap();
    let handle = state.start().unwrap();

    let domain = state
        .domain_service
        .register(request("Expired-Site.FR"))
        .await
        .unwrap();
    assert_eq!(domain.name, "expired-site.fr");

    let report = state.monitor.request_manual_check(domain.id).await.unwrap();
    assert_eq!(report.domain.status, DomainStatus::Available);
    assert!(report.outcome.notification_triggered);

    handle.shutdown().await;

    assert_eq!(transport.sent.load(Ordering::SeqCst), 1);
    let notifications = store.recent_notifications(domain.id, 10).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].success);
    let checks = store.recent_checks(domain.id, 10).await.unwrap();
    assert_eq!(checks.len(), 1);

    let status = state.monitor.domain_status(domain.id).await.unwrap();
    assert_eq!(status.domain.status, DomainStatus::Available);
    assert_eq!(status.domain.previous_status, DomainStatus::Unknown);
}

#[tokio::test]
async fn registration_enforces_supported_extensions() {
    let (store, _tmp) = create_test_sqlite_store().await;
    let (primary, secondary) = fixed_probes(&ProbeOutcome::Exists);

    let state = AppStateBuilder::new(AppConfig::default())
        .store(store)
        .transport(Arc::new(CountingTransport::default()))
        .probes(primary, secondary)
        .build()
        .unwrap();

    let err = state
        .domain_service
        .register(request("example.org"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationError(_)));

    state
        .domain_service
        .register(request("example.net"))
        .await
        .unwrap();
    let err = state
        .domain_service
        .register(request("EXAMPLE.net"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DomainAlreadyExists(_)));
}
