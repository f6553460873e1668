use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::GatewayConfig,
    data_objects::{NewRemoteOrder, RemoteOrder},
    GatewayApiError,
};

/// A thin client for the payment gateway's REST API. It holds no state beyond its configuration.
#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Creates an order at the gateway for `amount` minor units, and returns it. The gateway's order id is what the
    /// customer's checkout widget pays against, and what comes back in webhooks.
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<RemoteOrder, GatewayApiError> {
        if amount <= 0 {
            return Err(GatewayApiError::InvalidRequest(format!("Amount must be positive, not {amount}")));
        }
        let body = NewRemoteOrder { amount, currency: currency.to_string(), receipt: receipt.to_string() };
        debug!("💳️ Creating gateway order for {receipt} ({amount} {currency})");
        let order = self.rest_query::<RemoteOrder, NewRemoteOrder>(Method::POST, "/v1/orders", Some(body)).await?;
        if order.amount != amount {
            warn!("💳️ Gateway order {} was created for {}, but we asked for {amount}", order.id, order.amount);
        }
        info!("💳️ Gateway order {} created for {receipt}", order.id);
        Ok(order)
    }
}
