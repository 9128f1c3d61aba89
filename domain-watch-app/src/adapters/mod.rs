//! Storage and notification adapters for the monitor daemon.

mod discord_webhook;

pub use discord_webhook::DiscordWebhookTransport;

#[cfg(feature = "sqlite-store")]
mod sqlite;

#[cfg(feature = "sqlite-store")]
pub use sqlite::SqliteStore;
