use std::{env, time::Duration};

use checkout_common::{helpers::env_flag, Secret, DEFAULT_CURRENCY_CODE};
use checkout_engine::checkout_api::file_access_api::{clamp_ttl, MAX_DOWNLOAD_TTL};
use gateway_tools::GatewayConfig;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

const DEFAULT_CHK_HOST: &str = "127.0.0.1";
const DEFAULT_CHK_PORT: u16 = 8470;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/checkout.db";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// The currency that new orders are priced in
    pub currency: String,
    pub gateway: GatewayConfig,
    /// The shared secret the payment gateway signs its webhooks with
    pub webhook_secret: Secret<String>,
    pub storage: StorageConfig,
    /// The lifetime of a download link when the client doesn't ask for one
    pub download_ttl: Duration,
    pub proxy: ProxyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CHK_HOST.to_string(),
            port: DEFAULT_CHK_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            gateway: GatewayConfig::default(),
            webhook_secret: Secret::default(),
            storage: StorageConfig::default(),
            download_ttl: MAX_DOWNLOAD_TTL,
            proxy: ProxyConfig::default(),
        }
    }
}

/// How to determine the client's address when the server sits behind a reverse proxy.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProxyConfig {
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
}

#[derive(Clone, Debug, Default)]
pub struct StorageConfig {
    /// Download links are issued under this URL, e.g. "https://files.example.com"
    pub base_url: String,
    /// Shared with the file host, which uses it to check download links
    pub signing_key: Secret<String>,
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CHK_HOST").ok().unwrap_or_else(|| DEFAULT_CHK_HOST.into());
        let port = env::var("CHK_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CHK_PORT. {e} Using the default, {DEFAULT_CHK_PORT}, instead."
                    );
                    DEFAULT_CHK_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CHK_PORT);
        let database_url = env::var("CHK_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ CHK_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let currency = env::var("CHK_CURRENCY").map(|s| s.trim().to_uppercase()).unwrap_or_else(|_| {
            info!("🪛️ CHK_CURRENCY is not set. Orders will be priced in {DEFAULT_CURRENCY_CODE}.");
            DEFAULT_CURRENCY_CODE.to_string()
        });
        let gateway = GatewayConfig::new_from_env_or_default();
        let webhook_secret = Secret::new(env::var("CHK_GATEWAY_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ CHK_GATEWAY_WEBHOOK_SECRET is not set. Every payment webhook will be rejected until it is set to \
                 the webhook secret configured at the payment gateway."
            );
            String::default()
        }));
        let storage = StorageConfig::from_env_or_default();
        let download_ttl = configure_download_ttl(env::var("CHK_DOWNLOAD_TTL_SECS").ok());
        let proxy = ProxyConfig {
            use_x_forwarded_for: env_flag("CHK_USE_X_FORWARDED_FOR", false),
            use_forwarded: env_flag("CHK_USE_FORWARDED", false),
        };
        Self { host, port, database_url, auth, currency, gateway, webhook_secret, storage, download_ttl, proxy }
    }
}

impl StorageConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("CHK_STORAGE_BASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ CHK_STORAGE_BASE_URL is not set. Download links will point at http://localhost/files");
            "http://localhost/files".to_string()
        });
        let signing_key = env::var("CHK_STORAGE_SIGNING_KEY").ok().unwrap_or_else(|| {
            warn!(
                "🚨️ CHK_STORAGE_SIGNING_KEY is not set. I'm using a random value for this session. The file host will \
                 not be able to verify any download links issued by this server."
            );
            random_secret()
        });
        Self { base_url, signing_key: Secret::new(signing_key) }
    }
}

fn configure_download_ttl(value: Option<String>) -> Duration {
    let Some(s) = value else {
        info!("🪛️ CHK_DOWNLOAD_TTL_SECS is not set. Using the default value of {}s.", MAX_DOWNLOAD_TTL.as_secs());
        return MAX_DOWNLOAD_TTL;
    };
    match s.trim().parse::<u64>() {
        Ok(secs) => {
            let ttl = clamp_ttl(Duration::from_secs(secs));
            if ttl.as_secs() != secs {
                warn!("🪛️ CHK_DOWNLOAD_TTL_SECS of {secs}s is out of range. Using {}s instead.", ttl.as_secs());
            }
            ttl
        },
        Err(e) => {
            warn!("🪛️ Invalid configuration value for CHK_DOWNLOAD_TTL_SECS. {e}");
            MAX_DOWNLOAD_TTL
        },
    }
}

fn random_secret() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect()
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// This is the HMAC key used to verify bearer tokens. Tokens are issued by the identity service, which holds the
    /// same key.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. No externally issued \
             token will be accepted. DO NOT operate on production like this. 🚨️🚨️🚨️"
        );
        Self { jwt_secret: Secret::new(random_secret()) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, String> {
        let jwt_secret = env::var("CHK_JWT_SECRET").map_err(|e| format!("CHK_JWT_SECRET is not available. {e}"))?;
        if jwt_secret.len() < 32 {
            return Err("CHK_JWT_SECRET must be at least 32 characters long".to_string());
        }
        Ok(Self { jwt_secret: Secret::new(jwt_secret) })
    }
}
