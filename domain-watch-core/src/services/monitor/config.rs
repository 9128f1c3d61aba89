//! Scheduling policy

use std::time::Duration;

use crate::error::{CoreError, CoreResult};

/// Cadences, ceilings and switches of the scheduling core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Period of the full sweep over all active domains
    pub sweep_interval: Duration,
    /// Period of fast probing while a domain is under watch
    pub watch_interval: Duration,
    /// Watch stops after this many probes without a status change
    pub watch_max_probes: u32,
    /// Watch stops after this long without a status change
    pub watch_max_duration: Duration,
    /// Minimum gap between two scheduled probe starts, across all domains
    pub probe_spacing: Duration,
    /// Checks allowed to run at the same time
    pub max_concurrent_checks: usize,
    /// How long a check waits for its domain's execution lock
    pub lock_wait: Duration,
    /// Promote to watch on a manual check that finds the domain available
    pub confirm_manual_immediately: bool,
    /// Also notify when an available domain is registered again
    pub notify_on_lost: bool,
    /// Check history kept for this many days; 0 keeps everything
    pub history_retention_days: u32,
    /// Run one sweep right after start instead of waiting a full interval
    pub sweep_on_startup: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(2 * 60 * 60),
            watch_interval: Duration::from_secs(2),
            watch_max_probes: 900,
            watch_max_duration: Duration::from_secs(30 * 60),
            probe_spacing: Duration::from_millis(100),
            max_concurrent_checks: 10,
            lock_wait: Duration::from_millis(250),
            confirm_manual_immediately: false,
            notify_on_lost: false,
            history_retention_days: 30,
            sweep_on_startup: false,
        }
    }
}

impl MonitorConfig {
    /// Reject settings the scheduler cannot honor
    pub fn validate(&self) -> CoreResult<()> {
        if self.sweep_interval.is_zero() || self.watch_interval.is_zero() {
            return Err(CoreError::ConfigError(
                "sweep and watch intervals must be positive".to_string(),
            ));
        }
        if self.watch_interval >= self.sweep_interval {
            return Err(CoreError::ConfigError(format!(
                "watch interval ({:?}) must be shorter than sweep interval ({:?})",
                self.watch_interval, self.sweep_interval
            )));
        }
        if self.max_concurrent_checks == 0 {
            return Err(CoreError::ConfigError(
                "max_concurrent_checks must be at least 1".to_string(),
            ));
        }
        if self.watch_max_probes == 0 || self.watch_max_duration.is_zero() {
            return Err(CoreError::ConfigError(
                "watch ceilings must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
