//! Per-domain status transitions.
//!
//! Pure: the caller supplies the prior state, the verdict and the clock, and
//! drives persistence, notification and scheduling from the returned
//! [`Transition`].

use chrono::{DateTime, Utc};

use crate::types::{DomainState, DomainStatus, Transition, Verdict};

/// Apply `verdict` to `state`, returning the new state and what happened.
#[must_use]
pub fn apply_verdict(
    state: &DomainState,
    verdict: Verdict,
    now: DateTime<Utc>,
) -> (DomainState, Transition) {
    let mut next = *state;
    next.last_checked = Some(now);

    let transition = match verdict {
        Verdict::Error => Transition::Errored,
        Verdict::Unavailable => {
            next.previous_status = state.status;
            next.status = DomainStatus::Unavailable;
            if state.status == DomainStatus::Unavailable {
                Transition::NoOp
            } else {
                Transition::BecameUnavailable { from: state.status }
            }
        }
        Verdict::Available => {
            next.previous_status = state.status;
            next.status = DomainStatus::Available;
            if state.status == DomainStatus::Available {
                Transition::NoOp
            } else {
                next.last_available = Some(now);
                Transition::BecameAvailable
            }
        }
    };

    (next, transition)
}
