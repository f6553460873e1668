use std::fmt::Display;

use checkout_engine::order_objects::SignedUrl;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/orders`. The idempotency key travels in the `Idempotency-Key` header.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreateOrderParams {
    pub cart_id: i64,
    pub address_id: i64,
}

/// Query string of the download endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DownloadParams {
    /// Requested lifetime of the capability, in seconds. Capped by the server.
    pub ttl: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub url: String,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
}

impl From<SignedUrl> for DownloadResponse {
    fn from(value: SignedUrl) -> Self {
        Self { url: value.url, expires_in: value.expires_in_secs, expires_at: value.expires_at }
    }
}

/// Sent back to the gateway when a verified webhook contradicts what we have recorded. It gets a 200 anyway, since
/// redelivering the same event would not change the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRejection {
    pub outcome: String,
    pub error: String,
}

impl WebhookRejection {
    pub fn new<S: Display>(error: S) -> Self {
        Self { outcome: "rejected".to_string(), error: error.to_string() }
    }
}
