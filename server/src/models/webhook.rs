use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "webhook_provider", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookProvider {
    Stripe,
}

/// Idempotency marker for one provider notification.
///
/// `(provider, event_id)` is unique; a second insert for the same pair is
/// how duplicate deliveries are detected.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebhookEventRecord {
    pub id: Uuid,
    pub provider: WebhookProvider,
    pub event_id: String,
    pub created_at: DateTime<Utc>,
}
