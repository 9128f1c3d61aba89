//! Global spacing between consecutive probe starts.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, sleep_until};

pub(crate) struct ProbePacer {
    spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl ProbePacer {
    pub(crate) fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait for the next free start slot.
    ///
    /// Slots are handed out in call order, `spacing` apart.
    pub(crate) async fn wait(&self) {
        if self.spacing.is_zero() {
            return;
        }
        let slot = {
            let mut next = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = next.map_or(now, |reserved| reserved.max(now));
            *next = Some(slot + self.spacing);
            slot
        };
        sleep_until(slot).await;
    }
}
