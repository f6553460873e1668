mod capability;
mod webhook_signature;

pub use capability::{CapabilitySigner, HmacUrlSigner};
pub use webhook_signature::{body_digest, calculate_hmac, verify_signature, HmacSha256};
