use serde::{Deserialize, Serialize};

/// Body of a create-order request. `amount` is in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRemoteOrder {
    pub amount: i64,
    pub currency: String,
    /// Our own reference for the order. The gateway echoes it back on the order and its payments.
    pub receipt: String,
}

/// An order as held by the gateway. Only the fields we use are listed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<i64>,
}
