use crate::{
    checkout_api::errors::CheckoutError,
    db_types::{NewPayment, Payment, Settlement},
    traits::{InsertPaymentResult, SettlementResult},
};

/// Storage for payments. Payments are only ever mutated in response to verified gateway events, and always together
/// with the order they pay for.
#[allow(async_fn_in_trait)]
pub trait PaymentManagement {
    async fn fetch_payment_for_order(&self, order_id: i64) -> Result<Option<Payment>, CheckoutError>;

    async fn fetch_payment_by_external_order_id(
        &self,
        external_order_id: &str,
    ) -> Result<Option<Payment>, CheckoutError>;

    /// Takes a new payment, and in a single atomic transaction,
    /// * inserts the payment with status `Initiated`,
    /// * moves the order from `Created` to `PaymentPending`.
    ///
    /// If a payment already exists for the order (including one inserted concurrently), nothing is written and the
    /// existing payment is returned. If the order is no longer `Created`, the transaction is rolled back and
    /// `InvalidTransition` is returned.
    async fn insert_payment_for_order(&self, payment: NewPayment) -> Result<InsertPaymentResult, CheckoutError>;

    /// In a single atomic transaction, moves the payment to the settlement's payment status (recording the gateway
    /// payment id) and the order from `PaymentPending` to the settlement's order status.
    ///
    /// Both updates are guarded on the current status. If either guard fails, the transaction is rolled back and
    /// [`SettlementResult::NotApplied`] is returned.
    async fn settle_payment(&self, payment_id: i64, settlement: Settlement) -> Result<SettlementResult, CheckoutError>;

    /// Marks an `Initiated` payment as `Authorized`. The order is unaffected. Returns `None` if the payment was not in
    /// `Initiated` status.
    async fn mark_payment_authorized(
        &self,
        payment_id: i64,
        external_payment_id: &str,
    ) -> Result<Option<Payment>, CheckoutError>;
}
