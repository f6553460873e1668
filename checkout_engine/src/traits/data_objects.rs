use crate::db_types::{Order, Payment};

/// The result of an idempotent order insert. `AlreadyExists` carries the order that won, which is returned to the
/// caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOrderResult {
    Inserted(Order),
    AlreadyExists(Order),
}

impl InsertOrderResult {
    pub fn into_order(self) -> Order {
        match self {
            Self::Inserted(o) | Self::AlreadyExists(o) => o,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPaymentResult {
    Inserted(Payment),
    AlreadyExists(Payment),
}

impl InsertPaymentResult {
    pub fn into_payment(self) -> Payment {
        match self {
            Self::Inserted(p) | Self::AlreadyExists(p) => p,
        }
    }
}

/// What happened when a gateway settlement was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementResult {
    /// Both rows were moved to their new status in one transaction.
    Applied { payment: Payment, order: Order },
    /// One of the guarded updates matched no row, so nothing was written. The caller re-reads current state to decide
    /// whether this was a duplicate delivery or a genuine conflict.
    NotApplied,
}
