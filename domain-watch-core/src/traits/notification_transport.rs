//! Outbound notification delivery abstraction

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{DeliveryResponse, DomainNotice};

/// Delivers a single notification message
///
/// Platform implementation:
/// - `DiscordWebhookTransport` (reqwest, domain-watch-app)
///
/// The transport owns its request timeout. A response (any status code) is
/// `Ok`; failures before a response is received are `Err(CoreError::NetworkError)`.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, notice: &DomainNotice) -> CoreResult<DeliveryResponse>;
}
