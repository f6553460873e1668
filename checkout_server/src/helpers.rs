use std::{net::IpAddr, str::FromStr};

use actix_web::{web, HttpRequest};
use log::{debug, trace};
use regex::Regex;

use crate::{config::ProxyConfig, errors::ServerError};

/// Path extractor settings. A path segment that does not parse (e.g. `/orders/abc`) is a 400 with a JSON error body.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, req| {
        debug!("💻️ Bad path {}. {err}", req.path());
        ServerError::InvalidRequestPath(err.to_string()).into()
    })
}

/// JSON body extractor settings. Malformed bodies are a 400 with a JSON error body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        debug!("💻️ Bad JSON body for {}. {err}", req.path());
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set in the proxy configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set in the proxy configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, proxy: ProxyConfig) -> Option<IpAddr> {
    let mut result = None;
    if proxy.use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        // The left-most entry is the original client
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if proxy.use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                let re = Regex::new(r#"for="?(?P<ip>[^;,"]+)"?"#).ok()?;
                re.captures(v).and_then(|caps| caps.name("ip")).map(|m| m.as_str().to_string())
            })
            .and_then(|s| IpAddr::from_str(&s).ok());
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.peer_addr().map(|a| a.ip());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr
    })
}
