//! Domain name related type definitions

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned domain identifier
pub type DomainId = i64;

/// Authoritative availability status of a monitored domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    /// Never successfully checked
    #[default]
    Unknown,
    /// Registered (taken)
    Unavailable,
    /// Registrable
    Available,
}

impl DomainStatus {
    /// Storage representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Unavailable => "unavailable",
            Self::Available => "available",
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "unavailable" => Ok(Self::Unavailable),
            "available" => Ok(Self::Available),
            other => Err(format!("Invalid domain status: {other}")),
        }
    }
}

/// The part of a domain record owned by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DomainState {
    pub status: DomainStatus,
    pub previous_status: DomainStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_available: Option<DateTime<Utc>>,
}

/// A monitored domain as persisted by the storage collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    /// Domain ID
    pub id: DomainId,
    /// Normalized domain name (e.g. `example.fr`)
    pub name: String,
    /// Extension without the leading dot (e.g. `fr`)
    pub extension: String,
    /// Niche or category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub niche: Option<String>,
    /// Estimated monthly traffic
    pub traffic: u64,
    /// Number of referring domains
    pub referring_domains: u64,
    pub status: DomainStatus,
    pub previous_status: DomainStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_available: Option<DateTime<Utc>>,
    /// Monitoring-enabled flag
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DomainRecord {
    /// Snapshot of the state-machine fields
    #[must_use]
    pub fn state(&self) -> DomainState {
        DomainState {
            status: self.status,
            previous_status: self.previous_status,
            last_checked: self.last_checked,
            last_available: self.last_available,
        }
    }

    /// Overwrite the state-machine fields
    pub fn set_state(&mut self, state: DomainState) {
        self.status = state.status;
        self.previous_status = state.previous_status;
        self.last_checked = state.last_checked;
        self.last_available = state.last_available;
    }
}

/// Request to start monitoring a domain (as received from the API layer)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDomainRequest {
    pub domain: String,
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default)]
    pub traffic: u64,
    #[serde(default)]
    pub referring_domains: u64,
}

/// A validated, normalized domain ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDomain {
    pub name: String,
    pub extension: String,
    pub niche: Option<String>,
    pub traffic: u64,
    pub referring_domains: u64,
}
