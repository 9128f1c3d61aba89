//! Statistics and status views

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::check::CheckOutcome;
use super::domain::DomainRecord;

/// Domain population counts as reported by the storage layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainCounts {
    pub total: u64,
    pub active: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_extension: BTreeMap<String, u64>,
}

/// Global monitor statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStats {
    #[serde(flatten)]
    pub counts: DomainCounts,
    pub active_watches: usize,
    pub skipped_checks: u64,
    pub last_sweep_at: Option<DateTime<Utc>>,
    pub next_sweep_at: Option<DateTime<Utc>>,
    pub notifications_today: u64,
}

/// Current status of a single domain
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatusView {
    #[serde(flatten)]
    pub domain: DomainRecord,
    pub is_watching: bool,
    pub recent_checks: Vec<CheckOutcome>,
}

/// Summary of one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub total: usize,
    pub checked: usize,
    pub skipped: usize,
    pub available: usize,
    pub errors: usize,
    pub notifications_triggered: usize,
    pub duration_ms: u64,
}
