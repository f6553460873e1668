use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use checkout_common::Money;
use checkout_engine::{traits::PaymentGateway, GatewayError};

/// A payment gateway that hands out sequential order ids and counts how often it was called. It can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    calls: Arc<AtomicU64>,
    offline: Arc<AtomicBool>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl PaymentGateway for ScriptedGateway {
    async fn create_remote_intent(&self, _amount: Money, _currency: &str, receipt: &str) -> Result<String, GatewayError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("connection refused".into()));
        }
        Ok(format!("order_{receipt}_{n}"))
    }
}
