use checkout_common::Money;
use checkout_engine::{
    db_types::{
        Address,
        Cart,
        CartLine,
        DigitalFile,
        FileAccessLog,
        Material,
        NewFileAccessLog,
        NewOrder,
        NewPayment,
        Order,
        OrderAddress,
        OrderLine,
        OrderStatusType,
        Payment,
        PaymentStatus,
        Product,
        Settlement,
    },
    traits::{
        CartManagement,
        CatalogLookup,
        FileAccessManagement,
        InsertOrderResult,
        InsertPaymentResult,
        OrderManagement,
        PaymentGateway,
        PaymentManagement,
        SettlementResult,
    },
    CheckoutError,
    GatewayError,
};
use chrono::{TimeZone, Utc};
use mockall::mock;

mock! {
    pub Backend {}
    impl CatalogLookup for Backend {
        async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CheckoutError>;
        async fn fetch_material(&self, material_id: i64) -> Result<Option<Material>, CheckoutError>;
    }
    impl CartManagement for Backend {
        async fn fetch_cart(&self, cart_id: i64) -> Result<Option<Cart>, CheckoutError>;
        async fn fetch_cart_lines(&self, cart_id: i64) -> Result<Vec<CartLine>, CheckoutError>;
        async fn fetch_address(&self, address_id: i64) -> Result<Option<Address>, CheckoutError>;
    }
    impl OrderManagement for Backend {
        async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, CheckoutError>;
        async fn fetch_order_by_idempotency_key(&self, user_id: i64, key: &str) -> Result<Option<Order>, CheckoutError>;
        async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, CheckoutError>;
        async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, CheckoutError>;
        async fn fetch_order_address(&self, order_id: i64) -> Result<Option<OrderAddress>, CheckoutError>;
        async fn insert_order_from_cart(&self, order: NewOrder) -> Result<InsertOrderResult, CheckoutError>;
        async fn update_order_status(&self, order_id: i64, from: OrderStatusType, to: OrderStatusType) -> Result<Option<Order>, CheckoutError>;
    }
    impl PaymentManagement for Backend {
        async fn fetch_payment_for_order(&self, order_id: i64) -> Result<Option<Payment>, CheckoutError>;
        async fn fetch_payment_by_external_order_id(&self, external_order_id: &str) -> Result<Option<Payment>, CheckoutError>;
        async fn insert_payment_for_order(&self, payment: NewPayment) -> Result<InsertPaymentResult, CheckoutError>;
        async fn settle_payment(&self, payment_id: i64, settlement: Settlement) -> Result<SettlementResult, CheckoutError>;
        async fn mark_payment_authorized(&self, payment_id: i64, external_payment_id: &str) -> Result<Option<Payment>, CheckoutError>;
    }
    impl FileAccessManagement for Backend {
        async fn fetch_file(&self, file_id: i64) -> Result<Option<DigitalFile>, CheckoutError>;
        async fn insert_access_log(&self, entry: NewFileAccessLog) -> Result<FileAccessLog, CheckoutError>;
        async fn fetch_access_logs_for_order(&self, order_id: i64) -> Result<Vec<FileAccessLog>, CheckoutError>;
    }
}

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_remote_intent(&self, amount: Money, currency: &str, receipt: &str) -> Result<String, GatewayError>;
    }
}

pub const USER_ID: i64 = 7;
pub const OTHER_USER_ID: i64 = 8;

pub fn order(id: i64, user_id: i64, status: OrderStatusType) -> Order {
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    Order {
        id,
        user_id,
        idempotency_key: format!("key-{id}"),
        subtotal: Money::from(4000),
        total: Money::from(4000),
        currency: "INR".into(),
        status,
        created_at: at,
        updated_at: at,
    }
}

pub fn payment(order_id: i64, status: PaymentStatus) -> Payment {
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 5, 0).unwrap();
    Payment {
        id: 100 + order_id,
        order_id,
        external_order_id: format!("order_ext_{order_id}"),
        external_payment_id: None,
        amount: Money::from(4000),
        currency: "INR".into(),
        status,
        failure_reason: None,
        created_at: at,
        updated_at: at,
    }
}
