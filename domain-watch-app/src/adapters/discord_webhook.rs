//! Discord webhook notification transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use domain_watch_core::error::{CoreError, CoreResult};
use domain_watch_core::traits::NotificationTransport;
use domain_watch_core::types::{DeliveryResponse, DomainNotice, NotificationKind};

/// Connect timeout, independent of the per-request timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Response bodies are cut to this many bytes in logs
const LOG_BODY_LIMIT: usize = 200;

const COLOR_AVAILABLE: u32 = 0x00_FF_00;
const COLOR_LOST: u32 = 0xFF_00_00;
const COLOR_TEST: u32 = 0x34_98_DB;

/// Posts notices as Discord embeds to one webhook URL.
pub struct DiscordWebhookTransport {
    client: Client,
    webhook_url: String,
}

impl DiscordWebhookTransport {
    /// # Errors
    /// Returns `CoreError::ConfigError` if the URL is empty or the HTTP client cannot be built.
    pub fn new(webhook_url: impl Into<String>, request_timeout: Duration) -> CoreResult<Self> {
        let webhook_url = webhook_url.into();
        if webhook_url.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "Discord webhook URL is not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
            .timeout(request_timeout)
            .build()
            .map_err(|e| CoreError::ConfigError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            webhook_url,
        })
    }
}

#[async_trait]
impl NotificationTransport for DiscordWebhookTransport {
    async fn send(&self, notice: &DomainNotice) -> CoreResult<DeliveryResponse> {
        log::debug!("[discord] POST {} notice for {}", notice.kind, notice.name);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&build_payload(notice))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::NetworkError(format!("Discord webhook timed out: {e}"))
                } else {
                    CoreError::NetworkError(format!("Discord webhook request failed: {e}"))
                }
            })?;

        let status = response.status();
        let header_hint = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if status.is_success() {
            log::debug!("[discord] Response Status: {}", status.as_u16());
            return Ok(DeliveryResponse::ok(status.as_u16()));
        }

        let body = response.text().await.unwrap_or_default();
        log::debug!(
            "[discord] HTTP {}: {}",
            status.as_u16(),
            truncate_for_log(&body)
        );

        let mut delivery =
            DeliveryResponse::failed(status.as_u16(), (!body.is_empty()).then_some(body));
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            delivery.retry_after =
                parse_retry_after(delivery.body.as_deref(), header_hint.as_deref());
            log::warn!(
                "[discord] Rate limited (HTTP 429), retry_after={:?}",
                delivery.retry_after
            );
        }
        Ok(delivery)
    }
}

/// Discord webhook body for one notice
pub(crate) fn build_payload(notice: &DomainNotice) -> Value {
    let timestamp = notice.detected_at.to_rfc3339();
    let niche = notice.niche.as_deref().unwrap_or("Not set");

    let embed = match notice.kind {
        NotificationKind::Available => json!({
            "title": "🎯 Domain available!",
            "description": format!("**{}** can be registered.", notice.name),
            "color": COLOR_AVAILABLE,
            "fields": [
                field("📍 Domain", &notice.name),
                field("🏷️ Extension", &notice.extension),
                field("🎨 Niche", niche),
                field("📊 Traffic", &format_number(notice.traffic)),
                field("🔗 Referring Domains", &format_number(notice.referring_domains)),
            ],
            "footer": { "text": "Domain Watch" },
            "timestamp": timestamp,
        }),
        NotificationKind::Lost => {
            let available_for = notice
                .available_for()
                .map_or_else(|| "Unknown".to_string(), format_elapsed);
            json!({
                "title": "⚠️ Domain lost!",
                "description": format!("**{}** is no longer available.", notice.name),
                "color": COLOR_LOST,
                "fields": [
                    field("📍 Domain", &notice.name),
                    field("🏷️ Extension", &notice.extension),
                    field("🎨 Niche", niche),
                    field("⏱️ Available for", &available_for),
                    field("📊 Traffic", &format_number(notice.traffic)),
                    field("🔗 Referring Domains", &format_number(notice.referring_domains)),
                ],
                "footer": { "text": "Domain Watch - watch stopped" },
                "timestamp": timestamp,
            })
        }
        NotificationKind::Test => json!({
            "title": "🧪 Test Notification - Domain Watch",
            "description": "This is a test notification to verify your Discord webhook is working correctly.",
            "color": COLOR_TEST,
            "fields": [
                { "name": "Status", "value": "✅ Webhook configured successfully", "inline": false },
            ],
            "footer": { "text": "Domain Watch - Test" },
            "timestamp": timestamp,
        }),
    };

    json!({ "embeds": [embed] })
}

fn field(name: &str, value: &str) -> Value {
    json!({ "name": name, "value": value, "inline": true })
}

/// `1234567` → `1,234,567`
fn format_number(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `5h 7m`
fn format_elapsed(elapsed: chrono::Duration) -> String {
    let minutes = elapsed.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Rate-limit hint from a Discord 429: JSON `retry_after` (seconds, fractional) first,
/// then the `Retry-After` header.
fn parse_retry_after(body: Option<&str>, header: Option<&str>) -> Option<Duration> {
    let from_body = body
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| v.get("retry_after").and_then(Value::as_f64));
    let from_header = header.and_then(|h| h.trim().parse::<f64>().ok());

    from_body
        .or(from_header)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

fn truncate_for_log(s: &str) -> &str {
    if s.len() <= LOG_BODY_LIMIT {
        return s;
    }
    let mut end = LOG_BODY_LIMIT;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn notice(kind: NotificationKind) -> DomainNotice {
        let detected_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        DomainNotice {
            kind,
            domain_id: 7,
            name: "example.fr".to_string(),
            extension: "fr".to_string(),
            niche: None,
            traffic: 1_234_567,
            referring_domains: 42,
            available_since: Some(detected_at - chrono::Duration::minutes(125)),
            detected_at,
        }
    }

    /// Serve one HTTP request with a canned response, returning the request body.
    async fn one_shot_server(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/webhook", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0_u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + length || n == 0 {
                        socket.write_all(response.as_bytes()).await.unwrap();
                        socket.shutdown().await.ok();
                        return text[header_end + 4..].to_string();
                    }
                }
                if n == 0 {
                    return String::new();
                }
            }
        });
        (url, handle)
    }

    #[test]
    fn available_payload_is_green_with_domain_fields() {
        let payload = build_payload(&notice(NotificationKind::Available));
        let embed = &payload["embeds"][0];

        assert_eq!(embed["color"], 65_280);
        let fields = embed["fields"].as_array().unwrap();
        assert_eq!(fields[0]["value"], "example.fr");
        assert_eq!(fields[2]["value"], "Not set");
        assert_eq!(fields[3]["value"], "1,234,567");
        assert_eq!(embed["timestamp"], "2026-03-01T12:00:00+00:00");
    }

    #[test]
    fn lost_payload_is_red_with_elapsed_time() {
        let payload = build_payload(&notice(NotificationKind::Lost));
        let embed = &payload["embeds"][0];

        assert_eq!(embed["color"], 16_711_680);
        let fields = embed["fields"].as_array().unwrap();
        assert!(fields.iter().any(|f| f["value"] == "2h 5m"));
    }

    #[test]
    fn test_payload_is_blue() {
        let payload = build_payload(&DomainNotice::test_notice(Utc::now()));
        assert_eq!(payload["embeds"][0]["color"], 3_447_003);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(12_345_678), "12,345,678");
    }

    #[test]
    fn retry_after_prefers_body_over_header() {
        assert_eq!(
            parse_retry_after(Some(r#"{"message":"slow down","retry_after":1.5}"#), Some("9")),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(
            parse_retry_after(Some("not json"), Some("3")),
            Some(Duration::from_secs(3))
        );
        assert_eq!(parse_retry_after(None, None), None);
        assert_eq!(parse_retry_after(Some(r#"{"retry_after":-1}"#), None), None);
    }

    #[test]
    fn empty_url_is_rejected() {
        assert!(matches!(
            DiscordWebhookTransport::new("  ", Duration::from_secs(10)),
            Err(CoreError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn no_content_is_success() {
        let (url, server) =
            one_shot_server("HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n").await;
        let transport = DiscordWebhookTransport::new(url, Duration::from_secs(5)).unwrap();

        let response = transport
            .send(&notice(NotificationKind::Available))
            .await
            .unwrap();

        assert_eq!(response, DeliveryResponse::ok(204));
        let body: Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(body["embeds"][0]["fields"][0]["value"], "example.fr");
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_hint() {
        let (url, _server) = one_shot_server(
            "HTTP/1.1 429 Too Many Requests\r\nContent-Type: application/json\r\nContent-Length: 20\r\nConnection: close\r\n\r\n{\"retry_after\":0.25}",
        )
        .await;
        let transport = DiscordWebhookTransport::new(url, Duration::from_secs(5)).unwrap();

        let response = transport
            .send(&notice(NotificationKind::Available))
            .await
            .unwrap();

        assert_eq!(response.status, 429);
        assert!(!response.success);
        assert_eq!(response.retry_after, Some(Duration::from_millis(250)));
    }

    #[tokio::test]
    async fn server_error_is_a_failed_response() {
        let (url, _server) = one_shot_server(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\noops",
        )
        .await;
        let transport = DiscordWebhookTransport::new(url, Duration::from_secs(5)).unwrap();

        let response = transport
            .send(&notice(NotificationKind::Lost))
            .await
            .unwrap();

        assert_eq!(
            response,
            DeliveryResponse::failed(500, Some("oops".to_string()))
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/webhook", listener.local_addr().unwrap());
        drop(listener);
        let transport = DiscordWebhookTransport::new(url, Duration::from_secs(2)).unwrap();

        let err = transport
            .send(&notice(NotificationKind::Available))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NetworkError(_)));
    }
}
