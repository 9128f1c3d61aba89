//! Double-check verdict reconciliation.
//!
//! Trust is asymmetric: one endpoint that still knows the name is enough to
//! call it taken, but both must report NXDOMAIN before it is called available.

use crate::types::{ProbeOutcome, Verdict};

/// Combine the primary and secondary probe outcomes into one verdict.
#[must_use]
pub fn reconcile(primary: &ProbeOutcome, secondary: &ProbeOutcome) -> Verdict {
    match (primary, secondary) {
        (ProbeOutcome::Exists, _) | (_, ProbeOutcome::Exists) => Verdict::Unavailable,
        (ProbeOutcome::Absent, ProbeOutcome::Absent) => Verdict::Available,
        (ProbeOutcome::Absent | ProbeOutcome::Inconclusive(_), ProbeOutcome::Inconclusive(_))
        | (ProbeOutcome::Inconclusive(_), ProbeOutcome::Absent) => Verdict::Error,
    }
}
