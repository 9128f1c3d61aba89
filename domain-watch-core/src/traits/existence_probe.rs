//! Name-resolution endpoint abstraction

use async_trait::async_trait;

use crate::types::ProbeOutcome;

/// One resolution endpoint able to answer "does this name exist?"
///
/// Implementations must not retry and must never map a failure to
/// [`ProbeOutcome::Absent`]. Timeouts are enforced by the caller as well.
#[async_trait]
pub trait ExistenceProbe: Send + Sync {
    /// Human-readable endpoint label (e.g. `8.8.8.8:53`)
    fn endpoint(&self) -> &str;

    /// Probe a normalized domain name
    async fn probe(&self, domain: &str) -> ProbeOutcome;
}
