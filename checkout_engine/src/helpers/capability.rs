//! # Download capabilities
//!
//! Paid digital files are never streamed through the checkout service. Instead, callers receive a short-lived URL
//! pointing straight at object storage. The URL carries its own expiry and a signature over the storage key and the
//! expiry, so that the storage front-end can check it without calling back:
//!
//! ```text
//!    {base_url}/{storage_key}?expires={unix_seconds}&signature={hex}
//! ```
//!
//! where `signature` is the hex-encoded HMAC-SHA256 of `{storage_key}:{unix_seconds}` under the storage signing key.
use checkout_common::Secret;
use chrono::{DateTime, Utc};
use hmac::Mac;

use crate::helpers::webhook_signature::keyed_mac;

/// Mints and checks capability URLs for stored objects.
pub trait CapabilitySigner {
    /// Produces a URL for `storage_key` that is valid until `expires_at`.
    fn sign(&self, storage_key: &str, expires_at: DateTime<Utc>) -> String;

    /// Checks a capability presented at time `now`. Expired capabilities and those whose signature does not match
    /// the key and expiry are rejected.
    fn verify(&self, storage_key: &str, expires: i64, signature: &str, now: DateTime<Utc>) -> bool;
}

#[derive(Debug, Clone)]
pub struct HmacUrlSigner {
    base_url: String,
    signing_key: Secret<String>,
}

impl HmacUrlSigner {
    pub fn new<S: Into<String>>(base_url: S, signing_key: Secret<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, signing_key }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn signature(&self, storage_key: &str, expires: i64) -> Vec<u8> {
        let mut mac = keyed_mac(self.signing_key.as_bytes());
        mac.update(format!("{storage_key}:{expires}").as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl CapabilitySigner for HmacUrlSigner {
    fn sign(&self, storage_key: &str, expires_at: DateTime<Utc>) -> String {
        let expires = expires_at.timestamp();
        let signature = hex::encode(self.signature(storage_key, expires));
        let key = storage_key.trim_start_matches('/');
        format!("{}/{key}?expires={expires}&signature={signature}", self.base_url)
    }

    fn verify(&self, storage_key: &str, expires: i64, signature: &str, now: DateTime<Utc>) -> bool {
        if now.timestamp() >= expires {
            return false;
        }
        let Ok(presented) = hex::decode(signature) else {
            return false;
        };
        let mut mac = keyed_mac(self.signing_key.as_bytes());
        mac.update(format!("{storage_key}:{expires}").as_bytes());
        mac.verify_slice(&presented).is_ok()
    }
}
