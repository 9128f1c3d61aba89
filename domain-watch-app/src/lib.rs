//! Platform-agnostic application bootstrap for Domain Watch.
//!
//! Provides `AppState` (service container), `AppStateBuilder` (adapter injection)
//! and `AppConfig` (TOML configuration).

pub mod adapters;
pub mod config;

use std::sync::Arc;

use domain_watch_core::error::{CoreError, CoreResult};
use domain_watch_core::services::{
    DomainService, Monitor, MonitorHandle, NotificationDispatcher, ResolverPair, ServiceContext,
};
use domain_watch_core::traits::{
    CheckHistoryRepository, DomainRepository, ExistenceProbe, NotificationRepository,
    NotificationTransport,
};

pub use config::AppConfig;

use adapters::DiscordWebhookTransport;

/// Platform-agnostic application state.
///
/// Holds all services and the `ServiceContext`. The daemon constructs this
/// once at startup via `AppStateBuilder`.
pub struct AppState {
    /// Effective configuration
    pub config: AppConfig,
    /// Service context (holds all storage adapters)
    pub ctx: Arc<ServiceContext>,
    /// Scheduling core
    pub monitor: Arc<Monitor>,
    /// Domain registration service
    pub domain_service: DomainService,
}

impl AppState {
    /// Spawn the sweep loop and the notification worker.
    pub fn start(&self) -> CoreResult<MonitorHandle> {
        let handle = self.monitor.start()?;
        log::info!(
            "Monitor started: sweep every {}s, watch every {}s",
            self.config.monitor.sweep_interval_secs,
            self.config.monitor.watch_interval_secs
        );
        Ok(handle)
    }
}

/// Builder for constructing `AppState` with platform-specific adapters.
///
/// # Required adapters
/// - `domain_repository`, `check_repository`, `notification_repository`
///   (or all three at once via [`AppStateBuilder::store`])
///
/// # Optional
/// - `transport`: defaults to `DiscordWebhookTransport` for `notification.webhook_url`
/// - `probes`: defaults to hickory probes against `dns.primary` / `dns.secondary`
pub struct AppStateBuilder {
    config: AppConfig,
    domain_repository: Option<Arc<dyn DomainRepository>>,
    check_repository: Option<Arc<dyn CheckHistoryRepository>>,
    notification_repository: Option<Arc<dyn NotificationRepository>>,
    transport: Option<Arc<dyn NotificationTransport>>,
    probes: Option<(Arc<dyn ExistenceProbe>, Arc<dyn ExistenceProbe>)>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            domain_repository: None,
            check_repository: None,
            notification_repository: None,
            transport: None,
            probes: None,
        }
    }

    /// Use one store for every repository.
    #[must_use]
    pub fn store<S>(self, store: Arc<S>) -> Self
    where
        S: DomainRepository + CheckHistoryRepository + NotificationRepository + 'static,
    {
        self.domain_repository(store.clone())
            .check_repository(store.clone())
            .notification_repository(store)
    }

    #[must_use]
    pub fn domain_repository(mut self, repo: Arc<dyn DomainRepository>) -> Self {
        self.domain_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn check_repository(mut self, repo: Arc<dyn CheckHistoryRepository>) -> Self {
        self.check_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn notification_repository(mut self, repo: Arc<dyn NotificationRepository>) -> Self {
        self.notification_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn NotificationTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn probes(
        mut self,
        primary: Arc<dyn ExistenceProbe>,
        secondary: Arc<dyn ExistenceProbe>,
    ) -> Self {
        self.probes = Some((primary, secondary));
        self
    }

    /// Build the `AppState`. The monitor is created but not started.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if required adapters are missing,
    /// `CoreError::ConfigError` if the configuration is invalid or no transport
    /// can be built from it.
    pub fn build(self) -> CoreResult<AppState> {
        let config = self.config;
        config.validate()?;

        let domain_repository = self.domain_repository.ok_or_else(|| {
            CoreError::ValidationError("domain_repository is required".to_string())
        })?;
        let check_repository = self.check_repository.ok_or_else(|| {
            CoreError::ValidationError("check_repository is required".to_string())
        })?;
        let notification_repository = self.notification_repository.ok_or_else(|| {
            CoreError::ValidationError("notification_repository is required".to_string())
        })?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let url = config.notification.webhook_url.as_deref().ok_or_else(|| {
                    CoreError::ConfigError(format!(
                        "notification.webhook_url is required (or set {})",
                        config::WEBHOOK_URL_ENV
                    ))
                })?;
                Arc::new(DiscordWebhookTransport::new(url, config.request_timeout())?)
            }
        };

        let resolvers = match self.probes {
            Some((primary, secondary)) => {
                ResolverPair::new(primary, secondary, config.probe_timeout())
            }
            None => ResolverPair::from_endpoints(
                &config.dns.primary,
                &config.dns.secondary,
                &config.dns.record_type,
                config.probe_timeout(),
            )?,
        };

        let ctx = Arc::new(ServiceContext::new(
            domain_repository,
            check_repository,
            notification_repository.clone(),
        ));

        let dispatcher = Arc::new(NotificationDispatcher::new(
            transport,
            notification_repository,
            config.retry_policy(),
        ));
        let monitor = Monitor::new(
            Arc::clone(&ctx),
            config.monitor_config(),
            resolvers,
            dispatcher,
        )?;
        let domain_service = DomainService::new(
            Arc::clone(&ctx),
            Arc::clone(&monitor),
            config.storage.supported_extensions.clone(),
        );

        Ok(AppState {
            config,
            ctx,
            monitor,
            domain_service,
        })
    }
}
