use std::{fmt::Debug, time::Duration};

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    checkout_api::{errors::CheckoutError, order_objects::SignedUrl},
    db_types::{FileAccessLog, NewFileAccessLog, OrderStatusType},
    helpers::CapabilitySigner,
    traits::{FileAccessManagement, OrderManagement},
};

/// No capability outlives this, whatever the caller asks for.
pub const MAX_DOWNLOAD_TTL: Duration = Duration::from_secs(300);

/// `FileAccessApi` decides, on every request, whether a caller may download a file, and if so mints a short-lived
/// capability URL for it.
///
/// Nothing about a previous decision is cached. An order that is paid now is checked again on the next request.
pub struct FileAccessApi<B, S> {
    db: B,
    signer: S,
    default_ttl: Duration,
}

impl<B, S> Debug for FileAccessApi<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FileAccessApi")
    }
}

impl<B, S> FileAccessApi<B, S> {
    pub fn new(db: B, signer: S) -> Self {
        Self { db, signer, default_ttl: MAX_DOWNLOAD_TTL }
    }

    /// The TTL used when the caller doesn't ask for one. Values above [`MAX_DOWNLOAD_TTL`] are clamped.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = clamp_ttl(ttl);
        self
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }
}

impl<B, S> FileAccessApi<B, S>
where
    B: OrderManagement + FileAccessManagement,
    S: CapabilitySigner,
{
    /// Authorizes a download of `file_id` as part of `order_id` and returns a capability URL for it.
    ///
    /// The order must belong to the caller and be `Paid`, and the file must belong to a product that is one of the
    /// order's line items. Buying the same product in another order does not count.
    ///
    /// Errors:
    /// * `NotFound` if the order is missing or not the caller's, or the file is missing or not part of the order.
    /// * `NotEligible` if the caller's order has not been paid.
    ///
    /// Every successful call appends a row to the file access log.
    pub async fn authorize(
        &self,
        order_id: i64,
        file_id: i64,
        caller_user_id: i64,
        requested_ttl: Option<Duration>,
        requester_address: Option<String>,
    ) -> Result<SignedUrl, CheckoutError> {
        let order =
            self.db.fetch_order_by_id(order_id).await?.filter(|o| o.user_id == caller_user_id).ok_or_else(|| {
                debug!("🔑️ Order #{order_id} does not exist or does not belong to user {caller_user_id}");
                CheckoutError::NotFound("order")
            })?;
        if order.status != OrderStatusType::Paid {
            debug!("🔑️ Order #{order_id} is {}. Downloads are not available yet.", order.status);
            return Err(CheckoutError::NotEligible);
        }
        let file = self.db.fetch_file(file_id).await?.ok_or(CheckoutError::NotFound("file"))?;
        let lines = self.db.fetch_order_lines(order.id).await?;
        if !lines.iter().any(|l| l.product_id == file.product_id) {
            warn!(
                "🔑️ User {caller_user_id} asked for file #{file_id} (product #{}) via order #{order_id}, which does not \
                 contain that product",
                file.product_id
            );
            return Err(CheckoutError::NotFound("file"));
        }
        let ttl = clamp_ttl(requested_ttl.unwrap_or(self.default_ttl));
        // Never more than 300, so the cast is lossless
        let expires_in_secs = ttl.as_secs() as i64;
        let expires_at = expiry(Utc::now(), expires_in_secs)?;
        let url = self.signer.sign(&file.storage_key, expires_at);
        let entry = NewFileAccessLog { user_id: caller_user_id, order_id: order.id, file_id: file.id, requester_address };
        let log = self.db.insert_access_log(entry).await?;
        info!(
            "🔑️ Download of '{}' authorized for user {caller_user_id} until {expires_at} (log #{})",
            file.file_name, log.id
        );
        Ok(SignedUrl { url, expires_in_secs, expires_at })
    }

    /// The full audit trail for an order. This is an administrative read, so there is no ownership filter.
    pub async fn access_logs_for_order(&self, order_id: i64) -> Result<Vec<FileAccessLog>, CheckoutError> {
        self.db.fetch_order_by_id(order_id).await?.ok_or(CheckoutError::NotFound("order"))?;
        self.db.fetch_access_logs_for_order(order_id).await
    }
}

/// Caps the TTL at [`MAX_DOWNLOAD_TTL`]. A zero TTL would mint a capability that is dead on arrival, so the floor is
/// one second.
pub fn clamp_ttl(requested: Duration) -> Duration {
    requested.clamp(Duration::from_secs(1), MAX_DOWNLOAD_TTL)
}

fn expiry(now: DateTime<Utc>, expires_in_secs: i64) -> Result<DateTime<Utc>, CheckoutError> {
    DateTime::from_timestamp(now.timestamp() + expires_in_secs, 0)
        .ok_or_else(|| CheckoutError::Validation("Capability expiry is out of range".into()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ttl_is_clamped() {
        assert_eq!(clamp_ttl(Duration::from_secs(60)), Duration::from_secs(60));
        assert_eq!(clamp_ttl(Duration::from_secs(300)), MAX_DOWNLOAD_TTL);
        assert_eq!(clamp_ttl(Duration::from_secs(3600)), MAX_DOWNLOAD_TTL);
        assert_eq!(clamp_ttl(Duration::from_secs(u64::MAX)), MAX_DOWNLOAD_TTL);
        assert_eq!(clamp_ttl(Duration::ZERO), Duration::from_secs(1));
    }

    #[test]
    fn expiry_is_whole_seconds_after_now() {
        let now = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let expires_at = expiry(now, 300).unwrap();
        assert_eq!(expires_at.timestamp(), 1_700_000_300);
        assert_eq!(expires_at.timestamp_subsec_nanos(), 0);
    }
}
