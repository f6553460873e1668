//! Plugs the gateway REST client into the engine's [`PaymentGateway`] boundary.
use checkout_common::Money;
use checkout_engine::{traits::PaymentGateway, GatewayError};
use gateway_tools::{GatewayApi, GatewayApiError};
use log::*;

#[derive(Clone)]
pub struct GatewayAdapter {
    api: GatewayApi,
}

impl GatewayAdapter {
    pub fn new(api: GatewayApi) -> Self {
        Self { api }
    }
}

impl PaymentGateway for GatewayAdapter {
    async fn create_remote_intent(&self, amount: Money, currency: &str, receipt: &str) -> Result<String, GatewayError> {
        let order = self.api.create_order(amount.value(), currency, receipt).await.map_err(gateway_error)?;
        trace!("💳️ Gateway order [{}] is {}", order.id, order.status);
        Ok(order.id)
    }
}

fn gateway_error(e: GatewayApiError) -> GatewayError {
    if e.is_transient() {
        warn!("💳️ Payment gateway is unavailable. {e}");
        GatewayError::Unavailable(e.to_string())
    } else {
        error!("💳️ Payment gateway rejected the request. {e}");
        GatewayError::Rejected(e.to_string())
    }
}
