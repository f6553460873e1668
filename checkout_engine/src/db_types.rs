//! Data types shared between the database backends and the public API.
//!
//! Naming follows the storage layer: `NewXxx` structs are what gets inserted, and `Xxx` structs are rows as they
//! come back out of the database.
use std::{fmt::Display, str::FromStr};

use checkout_common::Money;
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {kind}: {value}")]
pub struct ConversionError {
    pub kind: &'static str,
    pub value: String,
}

impl ConversionError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

//--------------------------------------        Catalog        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub base_price: Money,
    pub is_active: bool,
}

/// The material a product is made from. `price` is the absolute per-unit price of the material, and is added to the
/// product's base price.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub name: String,
    pub price: Money,
    pub is_active: bool,
}

//--------------------------------------         Cart          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartLine {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub material_id: i64,
    pub quantity: i64,
}

/// A saved shipping address. This is live data that the user may edit or delete at any time, which is why orders
/// keep their own [`OrderAddress`] copy.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created from a cart. No payment has been requested yet.
    Created,
    /// A payment intent exists at the gateway and we are waiting for the webhook.
    PaymentPending,
    /// The gateway has confirmed capture of the full amount.
    Paid,
    /// The gateway reported that the payment failed.
    PaymentFailed,
    /// Reserved. Nothing transitions into this state yet.
    Cancelled,
}

impl OrderStatusType {
    /// The edges of the order state machine. No edge re-enters `Created` and nothing leaves a terminal state.
    pub fn can_transition_to(&self, to: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!((self, to), (Created, PaymentPending) | (PaymentPending, Paid) | (PaymentPending, PaymentFailed))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::PaymentFailed | Self::Cancelled)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::PaymentPending => write!(f, "PaymentPending"),
            Self::Paid => write!(f, "Paid"),
            Self::PaymentFailed => write!(f, "PaymentFailed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "PaymentPending" => Ok(Self::PaymentPending),
            "Paid" => Ok(Self::Paid),
            "PaymentFailed" => Ok(Self::PaymentFailed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError::new("order status", s)),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Created");
            OrderStatusType::Created
        })
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
/// An order row. Everything except `status` (and `updated_at`) is written once and never changes.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub idempotency_key: String,
    pub subtotal: Money,
    pub total: Money,
    pub currency: String,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A priced line item, frozen at order-creation time.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub material_id: i64,
    pub product_name: String,
    pub base_price: Money,
    pub material_price: Money,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_id: i64,
    pub material_id: i64,
    pub product_name: String,
    pub base_price: Money,
    pub material_price: Money,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

/// The shipping address as it was when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderAddress {
    pub order_id: i64,
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderAddress {
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl From<Address> for NewOrderAddress {
    fn from(a: Address) -> Self {
        Self {
            recipient: a.recipient,
            line1: a.line1,
            line2: a.line2,
            city: a.city,
            region: a.region,
            postal_code: a.postal_code,
            country: a.country,
        }
    }
}

/// Everything needed to write an order in one transaction: the order row, its line snapshots, its address snapshot,
/// and the cart that must be emptied.
///
/// `cart_line_ids` are the cart lines that were priced into `lines`. The order only commits if those are exactly the
/// lines the cart still holds.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub idempotency_key: String,
    pub cart_id: i64,
    pub cart_line_ids: Vec<i64>,
    pub subtotal: Money,
    pub total: Money,
    pub currency: String,
    pub lines: Vec<NewOrderLine>,
    pub address: NewOrderAddress,
}

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Created,
    Initiated,
    Authorized,
    Captured,
    Failed,
}

impl PaymentStatus {
    /// Statuses from which the gateway may still settle the payment.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Created | Self::Initiated | Self::Authorized)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Initiated => write!(f, "Initiated"),
            Self::Authorized => write!(f, "Authorized"),
            Self::Captured => write!(f, "Captured"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "Initiated" => Ok(Self::Initiated),
            "Authorized" => Ok(Self::Authorized),
            "Captured" => Ok(Self::Captured),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError::new("payment status", s)),
        }
    }
}

//--------------------------------------        Payment        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    /// The order id assigned by the payment gateway
    pub external_order_id: String,
    /// The gateway's payment id. Only known once the gateway reports on the payment.
    pub external_payment_id: Option<String>,
    /// Always a copy of the order total at initiation time
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub order_id: i64,
    pub external_order_id: String,
    pub amount: Money,
    pub currency: String,
}

/// The terminal result the gateway reported for a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Captured { external_payment_id: String },
    Failed { external_payment_id: Option<String>, reason: Option<String> },
}

impl Settlement {
    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            Self::Captured { .. } => PaymentStatus::Captured,
            Self::Failed { .. } => PaymentStatus::Failed,
        }
    }

    pub fn order_status(&self) -> OrderStatusType {
        match self {
            Self::Captured { .. } => OrderStatusType::Paid,
            Self::Failed { .. } => OrderStatusType::PaymentFailed,
        }
    }

    pub fn external_payment_id(&self) -> Option<&str> {
        match self {
            Self::Captured { external_payment_id } => Some(external_payment_id.as_str()),
            Self::Failed { external_payment_id, .. } => external_payment_id.as_deref(),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Captured { .. } => None,
            Self::Failed { reason, .. } => reason.as_deref(),
        }
    }
}

//--------------------------------------    Digital files      ---------------------------------------------------------
/// A downloadable asset. It belongs to exactly one product, and is only ever handed out through a short-lived
/// capability URL.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DigitalFile {
    pub id: i64,
    pub product_id: i64,
    /// The object key in the storage bucket
    pub storage_key: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct FileAccessLog {
    pub id: i64,
    pub user_id: i64,
    pub order_id: i64,
    pub file_id: i64,
    pub requester_address: Option<String>,
    pub accessed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFileAccessLog {
    pub user_id: i64,
    pub order_id: i64,
    pub file_id: i64,
    pub requester_address: Option<String>,
}

//--------------------------------------     Roles / Caller     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// A regular customer. Can only see their own orders.
    User,
    /// Back-office read access, e.g. to the file access audit trail.
    ReadAll,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::ReadAll => write!(f, "read_all"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "read_all" => Ok(Self::ReadAll),
            s => Err(ConversionError::new("role", s)),
        }
    }
}

/// The authenticated identity behind a request, as established by whatever issues sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: i64,
    pub roles: Vec<Role>,
}

impl Caller {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
