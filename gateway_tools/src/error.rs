use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Invalid order request: {0}")]
    InvalidRequest(String),
}

impl GatewayApiError {
    /// True if retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RestResponseError(_) => true,
            Self::QueryError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(GatewayApiError::RestResponseError("connection reset".into()).is_transient());
        assert!(GatewayApiError::QueryError { status: 503, message: String::new() }.is_transient());
        assert!(GatewayApiError::QueryError { status: 429, message: String::new() }.is_transient());
        assert!(!GatewayApiError::QueryError { status: 400, message: String::new() }.is_transient());
        assert!(!GatewayApiError::InvalidRequest("amount".into()).is_transient());
    }
}
