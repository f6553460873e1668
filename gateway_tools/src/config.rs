use checkout_common::Secret;
use log::*;

#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Root of the gateway's REST API, without a trailing slash
    pub base_url: String,
    pub key_id: String,
    pub key_secret: Secret<String>,
}

impl GatewayConfig {
    pub fn new<S: Into<String>>(base_url: S, key_id: S, key_secret: Secret<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, key_id: key_id.into(), key_secret }
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("CHK_GATEWAY_URL").unwrap_or_else(|_| {
            warn!("🪛️ CHK_GATEWAY_URL not set, using https://api.razorpay.com as default");
            "https://api.razorpay.com".to_string()
        });
        let key_id = std::env::var("CHK_GATEWAY_KEY_ID").unwrap_or_else(|_| {
            warn!("🪛️ CHK_GATEWAY_KEY_ID not set, using (probably useless) default");
            "rzp_test_00000000000000".to_string()
        });
        let key_secret = Secret::new(std::env::var("CHK_GATEWAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ CHK_GATEWAY_KEY_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        Self::new(base_url, key_id, key_secret)
    }
}
