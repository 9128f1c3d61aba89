//! Probe, verdict and check-outcome types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{DomainId, DomainRecord, DomainStatus};

/// Why a probe could not classify the domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum InconclusiveReason {
    /// The endpoint did not answer within the probe timeout
    Timeout,
    /// Connection or I/O failure
    Transport(String),
    /// The endpoint answered with a response code that says nothing about existence
    Response(String),
    /// The answer could not be interpreted
    Malformed(String),
}

impl fmt::Display for InconclusiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Transport(detail) => write!(f, "transport: {detail}"),
            Self::Response(code) => write!(f, "response: {code}"),
            Self::Malformed(detail) => write!(f, "malformed: {detail}"),
        }
    }
}

/// Result of a single existence probe against one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "camelCase")]
pub enum ProbeOutcome {
    /// The endpoint knows the name
    Exists,
    /// The endpoint affirmatively reported NXDOMAIN
    Absent,
    /// No usable answer; never to be read as `Absent`
    Inconclusive(InconclusiveReason),
}

/// A probe outcome plus where and how long
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub endpoint: String,
    pub outcome: ProbeOutcome,
    pub latency_ms: u64,
}

/// Reconciled availability classification for one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Available,
    Unavailable,
    Error,
}

impl Verdict {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "unavailable" => Ok(Self::Unavailable),
            "error" => Ok(Self::Error),
            other => Err(format!("Invalid verdict: {other}")),
        }
    }
}

/// Which scheduling path produced a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckPath {
    Sweep,
    Watch,
    Manual,
}

impl CheckPath {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sweep => "sweep",
            Self::Watch => "watch",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for CheckPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sweep" => Ok(Self::Sweep),
            "watch" => Ok(Self::Watch),
            "manual" => Ok(Self::Manual),
            other => Err(format!("Invalid check path: {other}")),
        }
    }
}

/// Immutable record of one completed check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub domain_id: DomainId,
    pub verdict: Verdict,
    pub path: CheckPath,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether this check emitted a notification event
    pub notification_triggered: bool,
    pub checked_at: DateTime<Utc>,
}

/// What the state machine decided for one verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Transition {
    /// Status did not change
    NoOp,
    /// Status moved to `unavailable`
    BecameUnavailable { from: DomainStatus },
    /// Status moved to `available` from anything else
    BecameAvailable,
    /// Verdict was `error`; status untouched
    Errored,
}

impl Transition {
    /// Domain was available and has been taken again
    #[must_use]
    pub fn is_reregistration(self) -> bool {
        matches!(
            self,
            Self::BecameUnavailable {
                from: DomainStatus::Available
            }
        )
    }
}

/// Everything a completed check produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    /// Domain after the transition was applied
    pub domain: DomainRecord,
    pub primary: ProbeReport,
    pub secondary: ProbeReport,
    pub outcome: CheckOutcome,
    pub transition: Transition,
}

/// Why a scheduled check did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Another check held the domain's execution lock
    LockContended,
    /// Domain is under fast watch; the sweep leaves it alone
    UnderWatch,
    /// Monitoring is disabled for the domain
    Inactive,
    /// Domain no longer exists
    Missing,
    /// The monitor is stopping
    ShuttingDown,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LockContended => "lock contended",
            Self::UnderWatch => "under watch",
            Self::Inactive => "inactive",
            Self::Missing => "missing",
            Self::ShuttingDown => "shutting down",
        })
    }
}

/// Result of dispatching a scheduled check
#[derive(Debug, Clone)]
pub enum CheckRun {
    Completed(Box<CheckReport>),
    Skipped(SkipReason),
}
