//! Daemon configuration loaded from a TOML file.
//!
//! Every field has a default, so an empty file (or no file) yields a working
//! configuration apart from the webhook URL.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use domain_watch_core::error::{CoreError, CoreResult};
use domain_watch_core::services::RetryPolicy;
use domain_watch_core::MonitorConfig;

/// Environment variable that overrides `notification.webhook_url`
pub const WEBHOOK_URL_ENV: &str = "DOMAIN_WATCH_WEBHOOK_URL";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub monitor: MonitorSection,
    pub dns: DnsSection,
    pub notification: NotificationSection,
    pub storage: StorageSection,
    pub logging: LoggingSection,
}

/// `[monitor]`: scheduling cadences and ceilings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorSection {
    pub sweep_interval_secs: u64,
    pub watch_interval_secs: u64,
    pub watch_max_probes: u32,
    pub watch_max_duration_secs: u64,
    pub probe_spacing_ms: u64,
    pub max_concurrent_checks: usize,
    pub lock_wait_ms: u64,
    pub confirm_manual_immediately: bool,
    pub notify_on_lost: bool,
    pub history_retention_days: u32,
    pub sweep_on_startup: bool,
}

impl Default for MonitorSection {
    fn default() -> Self {
        let defaults = MonitorConfig::default();
        Self {
            sweep_interval_secs: defaults.sweep_interval.as_secs(),
            watch_interval_secs: defaults.watch_interval.as_secs(),
            watch_max_probes: defaults.watch_max_probes,
            watch_max_duration_secs: defaults.watch_max_duration.as_secs(),
            probe_spacing_ms: duration_millis(defaults.probe_spacing),
            max_concurrent_checks: defaults.max_concurrent_checks,
            lock_wait_ms: duration_millis(defaults.lock_wait),
            confirm_manual_immediately: defaults.confirm_manual_immediately,
            notify_on_lost: defaults.notify_on_lost,
            history_retention_days: defaults.history_retention_days,
            sweep_on_startup: defaults.sweep_on_startup,
        }
    }
}

/// `[dns]`: the two resolution endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DnsSection {
    /// `ip` or `ip:port`
    pub primary: String,
    pub secondary: String,
    /// Record type queried to test existence
    pub record_type: String,
    pub probe_timeout_secs: u64,
}

impl Default for DnsSection {
    fn default() -> Self {
        Self {
            primary: "8.8.8.8".to_string(),
            secondary: "1.1.1.1".to_string(),
            record_type: "NS".to_string(),
            probe_timeout_secs: 5,
        }
    }
}

/// `[notification]`: webhook target and retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationSection {
    pub webhook_url: Option<String>,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_base_delay_secs: u64,
    pub retry_max_delay_secs: u64,
}

impl Default for NotificationSection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            webhook_url: None,
            request_timeout_secs: 10,
            max_attempts: policy.max_attempts,
            retry_base_delay_secs: policy.base_delay.as_secs(),
            retry_max_delay_secs: policy.max_delay.as_secs(),
        }
    }
}

/// `[storage]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSection {
    pub database_path: PathBuf,
    /// Extensions accepted at registration; empty accepts any
    pub supported_extensions: Vec<String>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/domain-watch.db"),
            supported_extensions: vec!["fr".to_string(), "com".to_string(), "net".to_string()],
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Read, parse and validate a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        let mut config = Self::parse(&content)?;
        config.override_webhook_url(std::env::var(WEBHOOK_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config = Self::parse(content)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str) -> CoreResult<Self> {
        toml::from_str(content)
            .map_err(|e| CoreError::ConfigError(format!("Invalid configuration: {e}")))
    }

    /// Replace the webhook URL with a non-empty override.
    pub fn override_webhook_url(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|url| !url.trim().is_empty()) {
            self.notification.webhook_url = Some(url);
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.monitor_config().validate()?;

        if self.dns.primary.trim().is_empty() || self.dns.secondary.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "dns.primary and dns.secondary are required".to_string(),
            ));
        }
        if self.dns.probe_timeout_secs == 0 {
            return Err(CoreError::ConfigError(
                "dns.probe_timeout_secs must be positive".to_string(),
            ));
        }
        if self.dns.primary.trim() == self.dns.secondary.trim() {
            log::warn!(
                "dns.primary and dns.secondary are both {}; the double check adds no independence",
                self.dns.primary
            );
        }

        if self.notification.max_attempts == 0 {
            return Err(CoreError::ConfigError(
                "notification.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.notification.request_timeout_secs == 0 {
            return Err(CoreError::ConfigError(
                "notification.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.notification.retry_base_delay_secs > self.notification.retry_max_delay_secs {
            return Err(CoreError::ConfigError(
                "notification.retry_base_delay_secs exceeds retry_max_delay_secs".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn monitor_config(&self) -> MonitorConfig {
        let m = &self.monitor;
        MonitorConfig {
            sweep_interval: Duration::from_secs(m.sweep_interval_secs),
            watch_interval: Duration::from_secs(m.watch_interval_secs),
            watch_max_probes: m.watch_max_probes,
            watch_max_duration: Duration::from_secs(m.watch_max_duration_secs),
            probe_spacing: Duration::from_millis(m.probe_spacing_ms),
            max_concurrent_checks: m.max_concurrent_checks,
            lock_wait: Duration::from_millis(m.lock_wait_ms),
            confirm_manual_immediately: m.confirm_manual_immediately,
            notify_on_lost: m.notify_on_lost,
            history_retention_days: m.history_retention_days,
            sweep_on_startup: m.sweep_on_startup,
        }
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.notification.max_attempts,
            base_delay: Duration::from_secs(self.notification.retry_base_delay_secs),
            max_delay: Duration::from_secs(self.notification.retry_max_delay_secs),
        }
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.dns.probe_timeout_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.notification.request_timeout_secs)
    }
}

fn duration_millis(value: Duration) -> u64 {
    u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
}
