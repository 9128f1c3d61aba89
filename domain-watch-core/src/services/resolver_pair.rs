//! Parallel existence probe against a primary and a secondary endpoint.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join;
use tokio::time::{Instant, timeout};

use crate::error::CoreResult;
use crate::traits::ExistenceProbe;
use crate::types::{InconclusiveReason, ProbeOutcome, ProbeReport};

use super::hickory_probe::HickoryProbe;

/// Both probe reports of one check
#[derive(Debug, Clone)]
pub struct PairReport {
    pub primary: ProbeReport,
    pub secondary: ProbeReport,
}

impl PairReport {
    /// Wall-clock latency of the pair (the slower of the two probes)
    #[must_use]
    pub fn latency_ms(&self) -> u64 {
        self.primary.latency_ms.max(self.secondary.latency_ms)
    }

    /// Human-readable detail for any inconclusive probe
    #[must_use]
    pub fn error_detail(&self) -> Option<String> {
        let details: Vec<String> = [&self.primary, &self.secondary]
            .into_iter()
            .filter_map(|report| match &report.outcome {
                ProbeOutcome::Inconclusive(reason) => Some(format!("{}: {reason}", report.endpoint)),
                ProbeOutcome::Exists | ProbeOutcome::Absent => None,
            })
            .collect();
        if details.is_empty() {
            None
        } else {
            Some(details.join("; "))
        }
    }
}

/// Two independently configured resolution endpoints
pub struct ResolverPair {
    primary: Arc<dyn ExistenceProbe>,
    secondary: Arc<dyn ExistenceProbe>,
    probe_timeout: Duration,
}

impl ResolverPair {
    #[must_use]
    pub fn new(
        primary: Arc<dyn ExistenceProbe>,
        secondary: Arc<dyn ExistenceProbe>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            probe_timeout,
        }
    }

    /// Build a pair of hickory probes from endpoint strings
    pub fn from_endpoints(
        primary: &str,
        secondary: &str,
        record_type: &str,
        probe_timeout: Duration,
    ) -> CoreResult<Self> {
        let primary = HickoryProbe::from_config(primary, record_type, probe_timeout)?;
        let secondary = HickoryProbe::from_config(secondary, record_type, probe_timeout)?;
        if primary.endpoint() == secondary.endpoint() {
            log::warn!(
                "Primary and secondary DNS endpoints are identical ({}); the double check adds no independence",
                primary.endpoint()
            );
        }
        Ok(Self::new(
            Arc::new(primary),
            Arc::new(secondary),
            probe_timeout,
        ))
    }

    /// Labels of the configured endpoints
    #[must_use]
    pub fn endpoints(&self) -> (&str, &str) {
        (self.primary.endpoint(), self.secondary.endpoint())
    }

    /// Probe both endpoints concurrently; returns once both finished or timed out.
    pub async fn probe(&self, domain: &str) -> PairReport {
        let (primary, secondary) = join(
            timed_probe(self.primary.as_ref(), domain, self.probe_timeout),
            timed_probe(self.secondary.as_ref(), domain, self.probe_timeout),
        )
        .await;
        PairReport { primary, secondary }
    }
}

async fn timed_probe(probe: &dyn ExistenceProbe, domain: &str, limit: Duration) -> ProbeReport {
    let start = Instant::now();
    let outcome = timeout(limit, probe.probe(domain))
        .await
        .unwrap_or(ProbeOutcome::Inconclusive(InconclusiveReason::Timeout));
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    ProbeReport {
        endpoint: probe.endpoint().to_string(),
        outcome,
        latency_ms,
    }
}
