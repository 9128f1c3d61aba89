//! Notification dispatcher
//!
//! Delivers transition notices through a [`NotificationTransport`] with
//! bounded retries and exponential backoff, then records the final result.
//! Notices reach the dispatcher over an unbounded queue so a slow webhook
//! never holds a domain's execution lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::CoreResult;
use crate::services::shutdown::stopped;
use crate::traits::{NotificationRepository, NotificationTransport};
use crate::types::{DeliveryResponse, DomainNotice, NotificationRecord};

/// Stored response bodies are cut to this many characters
const MAX_RESPONSE_CHARS: usize = 500;

/// Retry policy for one notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt, doubled after each further failure
    pub base_delay: Duration,
    /// Upper bound for both backoff and server-provided `retry_after`
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff after the failed attempt number `attempt` (0-based)
    ///
    /// `base`, `2 * base`, `4 * base`, ... capped at `max_delay`
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let capped_attempt = attempt.min(20); // Prevent 2^attempt from overflowing
        self.base_delay
            .saturating_mul(1_u32 << capped_attempt)
            .min(self.max_delay)
    }

    /// Delay before the next attempt, preferring the server's rate-limit hint
    fn retry_delay(&self, response: Option<&DeliveryResponse>, attempt: u32) -> Duration {
        match response.and_then(|r| r.retry_after) {
            Some(hint) => hint.min(self.max_delay),
            None => self.backoff_delay(attempt),
        }
    }
}

pub struct NotificationDispatcher {
    transport: Arc<dyn NotificationTransport>,
    repository: Arc<dyn NotificationRepository>,
    policy: RetryPolicy,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(
        transport: Arc<dyn NotificationTransport>,
        repository: Arc<dyn NotificationRepository>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            repository,
            policy,
        }
    }

    /// Deliver one notice and persist exactly one record of the outcome.
    ///
    /// Never fails: delivery and persistence problems are logged.
    pub async fn dispatch(&self, notice: &DomainNotice) -> NotificationRecord {
        let record = self.deliver(notice).await;

        if record.success {
            log::info!(
                "Notification sent: {} {} (attempts: {})",
                notice.kind,
                notice.name,
                record.attempts
            );
        } else {
            log::error!(
                "Notification failed after {} attempt(s): {} {} (status: {:?}, response: {})",
                record.attempts,
                notice.kind,
                notice.name,
                record.http_status,
                record.response.as_deref().unwrap_or("-")
            );
        }

        if let Err(e) = self.repository.save_notification(&record).await {
            log::error!("Failed to record notification for {}: {e}", notice.name);
        }

        record
    }

    /// Send a single test notice without retries or persistence
    pub async fn send_test(&self) -> CoreResult<DeliveryResponse> {
        let notice = DomainNotice::test_notice(Utc::now());
        let response = self.transport.send(&notice).await?;
        log::info!(
            "Test notification returned HTTP {} (success: {})",
            response.status,
            response.success
        );
        Ok(response)
    }

    async fn deliver(&self, notice: &DomainNotice) -> NotificationRecord {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = 0;
        let mut last_status = None;
        let mut last_detail = None;

        while attempts < max_attempts {
            attempts += 1;
            let result = self.transport.send(notice).await;

            let response = match result {
                Ok(response) if response.success => {
                    return record(notice, Some(response.status), true, None, attempts);
                }
                Ok(response) => {
                    last_status = Some(response.status);
                    last_detail = response.body.clone();
                    Some(response)
                }
                Err(e) => {
                    last_detail = Some(e.to_string());
                    None
                }
            };

            if attempts < max_attempts {
                let delay = self.policy.retry_delay(response.as_ref(), attempts - 1);
                log::warn!(
                    "[{}] Notification attempt {}/{} failed (status: {:?}), retrying in {:.1}s",
                    notice.name,
                    attempts,
                    max_attempts,
                    last_status,
                    delay.as_secs_f32()
                );
                tokio::time::sleep(delay).await;
            }
        }

        record(notice, last_status, false, last_detail, attempts)
    }

    /// Run the dispatcher worker.
    ///
    /// Notices are delivered one at a time in arrival order. Once `shutdown`
    /// flips to `true` (or its sender is dropped) the queue is closed and
    /// whatever is already queued is still delivered before the task ends.
    pub fn spawn_worker(
        self: Arc<Self>,
        mut queue: mpsc::UnboundedReceiver<DomainNotice>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    notice = queue.recv() => match notice {
                        Some(notice) => {
                            self.dispatch(&notice).await;
                        }
                        None => break,
                    },
                    () = stopped(&mut shutdown) => {
                        queue.close();
                        let mut drained = 0_usize;
                        while let Some(notice) = queue.recv().await {
                            self.dispatch(&notice).await;
                            drained += 1;
                        }
                        if drained > 0 {
                            log::info!("Delivered {drained} queued notification(s) during shutdown");
                        }
                        break;
                    }
                }
            }
            log::debug!("Notification worker stopped");
        })
    }
}

/// Queue handle used by the check pipeline
#[derive(Clone)]
pub struct NotificationQueue {
    sender: mpsc::UnboundedSender<DomainNotice>,
}

impl NotificationQueue {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DomainNotice>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Enqueue a notice; returns `false` if the worker is gone
    pub fn enqueue(&self, notice: DomainNotice) -> bool {
        let kind = notice.kind;
        let name = notice.name.clone();
        if self.sender.send(notice).is_ok() {
            true
        } else {
            log::error!("Notification queue closed, dropping {kind} notice for {name}");
            false
        }
    }
}

fn record(
    notice: &DomainNotice,
    http_status: Option<u16>,
    success: bool,
    response: Option<String>,
    attempts: u32,
) -> NotificationRecord {
    NotificationRecord {
        domain_id: notice.domain_id,
        kind: notice.kind,
        http_status,
        success,
        response: response.map(|text| truncate(&text)),
        attempts,
        sent_at: Utc::now(),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_RESPONSE_CHARS {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(MAX_RESPONSE_CHARS).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::types::NotificationKind;
    use crate::test_utils::{InMemoryStore, RecordingTransport, sample_domain};
    use tokio::time::Instant;

    fn notice() -> DomainNotice {
        DomainNotice::for_domain(
            NotificationKind::Available,
            &sample_domain(1, "example.fr"),
            Utc::now(),
        )
    }

    fn dispatcher(
        transport: &Arc<RecordingTransport>,
        store: &Arc<InMemoryStore>,
    ) -> NotificationDispatcher {
        NotificationDispatcher::new(transport.clone(), store.clone(), RetryPolicy::default())
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(8));
        assert_eq!(policy.backoff_delay(4), Duration::from_secs(30));
        assert_eq!(policy.backoff_delay(40), Duration::from_secs(30));
    }

    #[test]
    fn retry_after_is_capped() {
        let policy = RetryPolicy::default();
        let mut limited = DeliveryResponse::failed(429, None);
        limited.retry_after = Some(Duration::from_secs(120));
        assert_eq!(policy.retry_delay(Some(&limited), 0), Duration::from_secs(30));
        limited.retry_after = Some(Duration::from_millis(1500));
        assert_eq!(
            policy.retry_delay(Some(&limited), 2),
            Duration::from_millis(1500)
        );
        assert_eq!(policy.retry_delay(None, 1), Duration::from_secs(4));
    }

    #[test]
    fn truncate_long_bodies() {
        let long = "x".repeat(MAX_RESPONSE_CHARS + 10);
        assert_eq!(truncate(&long).chars().count(), MAX_RESPONSE_CHARS + 1);
        assert_eq!(truncate("short"), "short");
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_records_one_attempt() {
        let transport = Arc::new(RecordingTransport::new());
        let store = Arc::new(InMemoryStore::new());

        let record = dispatcher(&transport, &store).dispatch(&notice()).await;

        assert!(record.success);
        assert_eq!(record.attempts, 1);
        assert_eq!(record.http_status, Some(204));
        assert_eq!(transport.sent().await.len(), 1);
        assert_eq!(store.notifications().await, vec![record]);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success_with_backoff() {
        let transport = Arc::new(RecordingTransport::new());
        transport
            .script([
                Ok(DeliveryResponse::failed(500, Some("boom".into()))),
                Err(CoreError::NetworkError("reset".into())),
                Ok(DeliveryResponse::ok(204)),
            ])
            .await;
        let store = Arc::new(InMemoryStore::new());

        let start = Instant::now();
        let record = dispatcher(&transport, &store).dispatch(&notice()).await;

        assert!(record.success);
        assert_eq!(record.attempts, 3);
        // 2s + 4s of backoff
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
        assert_eq!(store.notifications().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let transport = Arc::new(RecordingTransport::new());
        transport
            .script([
                Ok(DeliveryResponse::failed(500, None)),
                Ok(DeliveryResponse::failed(502, None)),
                Ok(DeliveryResponse::failed(503, Some("unavailable".into()))),
                Ok(DeliveryResponse::ok(204)),
            ])
            .await;
        let store = Arc::new(InMemoryStore::new());

        let record = dispatcher(&transport, &store).dispatch(&notice()).await;

        assert!(!record.success);
        assert_eq!(record.attempts, 3);
        assert_eq!(record.http_status, Some(503));
        assert_eq!(record.response.as_deref(), Some("unavailable"));
        assert_eq!(transport.sent().await.len(), 3);
        assert_eq!(store.notifications().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn honors_retry_after_hint() {
        let transport = Arc::new(RecordingTransport::new());
        let mut limited = DeliveryResponse::failed(429, None);
        limited.retry_after = Some(Duration::from_millis(700));
        transport
            .script([Ok(limited), Ok(DeliveryResponse::ok(204))])
            .await;
        let store = Arc::new(InMemoryStore::new());

        let start = Instant::now();
        let record = dispatcher(&transport, &store).dispatch(&notice()).await;

        assert!(record.success);
        assert_eq!(record.attempts, 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(700) && elapsed < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_only_has_no_status() {
        let transport = Arc::new(RecordingTransport::new());
        transport
            .script([
                Err(CoreError::NetworkError("dns".into())),
                Err(CoreError::NetworkError("dns".into())),
                Err(CoreError::NetworkError("dns".into())),
            ])
            .await;
        let store = Arc::new(InMemoryStore::new());

        let record = dispatcher(&transport, &store).dispatch(&notice()).await;

        assert!(!record.success);
        assert_eq!(record.http_status, None);
        assert!(record.response.unwrap().contains("dns"));
    }

    #[tokio::test]
    async fn send_test_does_not_persist() {
        let transport = Arc::new(RecordingTransport::new());
        let store = Arc::new(InMemoryStore::new());

        let response = dispatcher(&transport, &store).send_test().await.unwrap();

        assert!(response.success);
        let sent = transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Test);
        assert!(store.notifications().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn worker_drains_queue_on_shutdown() {
        let transport = Arc::new(RecordingTransport::new());
        let store = Arc::new(InMemoryStore::new());
        let dispatcher = Arc::new(dispatcher(&transport, &store));
        let (queue, receiver) = NotificationQueue::channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        assert!(queue.enqueue(notice()));
        assert!(queue.enqueue(notice()));
        shutdown_tx.send_replace(true);

        let worker = dispatcher.spawn_worker(receiver, shutdown_rx);
        worker.await.unwrap();

        assert_eq!(store.notifications().await.len(), 2);
        assert!(!queue.enqueue(notice()));
    }
}
