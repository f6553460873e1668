use crate::{
    checkout_api::errors::CheckoutError,
    db_types::{DigitalFile, FileAccessLog, NewFileAccessLog},
};

/// Downloadable files and their audit trail. The audit trail is append-only: there are no update or delete methods.
#[allow(async_fn_in_trait)]
pub trait FileAccessManagement {
    async fn fetch_file(&self, file_id: i64) -> Result<Option<DigitalFile>, CheckoutError>;

    async fn insert_access_log(&self, entry: NewFileAccessLog) -> Result<FileAccessLog, CheckoutError>;

    /// Every successful authorization for the order, oldest first.
    async fn fetch_access_logs_for_order(&self, order_id: i64) -> Result<Vec<FileAccessLog>, CheckoutError>;
}
