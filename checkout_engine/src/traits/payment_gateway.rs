use checkout_common::Money;

use crate::checkout_api::errors::GatewayError;

/// The outbound half of the payment gateway boundary.
///
/// Implementations make exactly one remote call per invocation and hold no business state. The inbound half
/// (webhook signature verification) is [`crate::helpers::verify_signature`].
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Creates a payment intent ("order" in most gateways' terms) for `amount` at the gateway and returns the
    /// gateway's id for it. `receipt` is our own reference, echoed back by the gateway for reconciliation.
    async fn create_remote_intent(&self, amount: Money, currency: &str, receipt: &str) -> Result<String, GatewayError>;
}
