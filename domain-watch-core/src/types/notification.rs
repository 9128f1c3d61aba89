//! Notification event and record types

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{DomainId, DomainRecord};

/// What a notification announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Domain became registrable
    Available,
    /// Domain that was available has been registered again
    Lost,
    /// Transport self-test, never persisted
    Test,
}

impl NotificationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Lost => "lost",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "lost" => Ok(Self::Lost),
            "test" => Ok(Self::Test),
            other => Err(format!("Invalid notification kind: {other}")),
        }
    }
}

/// Payload handed to the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainNotice {
    pub kind: NotificationKind,
    pub domain_id: DomainId,
    pub name: String,
    pub extension: String,
    pub niche: Option<String>,
    pub traffic: u64,
    pub referring_domains: u64,
    /// When the domain was last seen becoming available
    pub available_since: Option<DateTime<Utc>>,
    pub detected_at: DateTime<Utc>,
}

impl DomainNotice {
    /// Build a notice describing `domain`
    #[must_use]
    pub fn for_domain(kind: NotificationKind, domain: &DomainRecord, now: DateTime<Utc>) -> Self {
        Self {
            kind,
            domain_id: domain.id,
            name: domain.name.clone(),
            extension: domain.extension.clone(),
            niche: domain.niche.clone(),
            traffic: domain.traffic,
            referring_domains: domain.referring_domains,
            available_since: domain.last_available,
            detected_at: now,
        }
    }

    /// Notice used to verify the transport configuration
    #[must_use]
    pub fn test_notice(now: DateTime<Utc>) -> Self {
        Self {
            kind: NotificationKind::Test,
            domain_id: 0,
            name: "example.com".to_string(),
            extension: "com".to_string(),
            niche: None,
            traffic: 0,
            referring_domains: 0,
            available_since: None,
            detected_at: now,
        }
    }

    /// How long the domain stayed available, for `Lost` notices
    #[must_use]
    pub fn available_for(&self) -> Option<chrono::Duration> {
        self.available_since.map(|since| self.detected_at - since)
    }
}

/// What the transport got back for one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub status: u16,
    pub success: bool,
    pub body: Option<String>,
    /// Server-provided delay before retrying (rate limiting)
    pub retry_after: Option<Duration>,
}

impl DeliveryResponse {
    #[must_use]
    pub fn ok(status: u16) -> Self {
        Self {
            status,
            success: true,
            body: None,
            retry_after: None,
        }
    }

    #[must_use]
    pub fn failed(status: u16, body: Option<String>) -> Self {
        Self {
            status,
            success: false,
            body,
            retry_after: None,
        }
    }
}

/// Immutable record of one notification delivery outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub domain_id: DomainId,
    pub kind: NotificationKind,
    /// `None` when no response was ever received
    pub http_status: Option<u16>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub attempts: u32,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_for_measures_from_last_available() {
        let since = Utc::now();
        let mut notice = DomainNotice::test_notice(since + chrono::Duration::minutes(90));
        notice.available_since = Some(since);
        assert_eq!(notice.available_for(), Some(chrono::Duration::minutes(90)));
    }

    #[test]
    fn test_notice_has_no_history() {
        let notice = DomainNotice::test_notice(Utc::now());
        assert_eq!(notice.kind, NotificationKind::Test);
        assert!(notice.available_for().is_none());
    }
}
