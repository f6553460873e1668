//! # Webhook signatures
//!
//! The payment gateway signs every webhook delivery with HMAC-SHA256, keyed with the shared webhook secret, over the
//! exact bytes of the request body. The hex-encoded result is sent in a request header.
//!
//! Verification must run against the raw body. Re-serialising a parsed body changes whitespace and key order and
//! breaks the signature.
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub type HmacSha256 = Hmac<Sha256>;

pub(crate) fn keyed_mac(key: &[u8]) -> HmacSha256 {
    // HMAC hashes long keys and pads short ones, so there is no key length it can refuse
    <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts any key length")
}

/// Calculates the hex-encoded HMAC-SHA256 of `data` with `secret` as the key.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = keyed_mac(secret.as_bytes());
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Returns true if `signature` is the hex-encoded HMAC-SHA256 of `raw_body` under `secret`.
///
/// The comparison is constant-time. Signatures that are not valid hex, or have the wrong length, are rejected. An
/// empty secret never verifies anything.
pub fn verify_signature(raw_body: &[u8], signature: &str, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let mut mac = keyed_mac(secret.as_bytes());
    mac.update(raw_body);
    mac.verify_slice(&expected).is_ok()
}

/// A short, loggable fingerprint of a request body. Used when rejecting deliveries so that operators can match log
/// entries against the gateway dashboard without the body itself ending up in the logs.
pub fn body_digest(raw_body: &[u8]) -> String {
    let digest = Sha256::digest(raw_body);
    hex::encode(&digest[..8])
}
