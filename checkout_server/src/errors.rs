use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use checkout_engine::CheckoutError;
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("The {0} header is required")]
    MissingHeader(&'static str),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("The request cannot be processed. {0}")]
    UnprocessableEntity(String),
    #[error("An upstream service is unavailable. {0}")]
    UpstreamUnavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::MissingHeader(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidSignature => StatusCode::UNAUTHORIZED,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No bearer token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("The payment gateway signature is invalid.")]
    InvalidSignature,
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::Validation(_) => Self::InvalidRequestBody(e.to_string()),
            CheckoutError::NotFound(_) => Self::NoRecordFound(e.to_string()),
            CheckoutError::Forbidden(_) => Self::InsufficientPermissions(e.to_string()),
            CheckoutError::NotEligible => Self::InsufficientPermissions(e.to_string()),
            CheckoutError::EmptyCart => Self::UnprocessableEntity(e.to_string()),
            CheckoutError::CartChanged => Self::Conflict(e.to_string()),
            CheckoutError::StaleReference(_) => Self::Conflict(e.to_string()),
            CheckoutError::InvalidState(_) => Self::Conflict(e.to_string()),
            CheckoutError::InvalidTransition { .. } => Self::Conflict(e.to_string()),
            CheckoutError::GatewayUnavailable(_) => Self::UpstreamUnavailable(e.to_string()),
            CheckoutError::InvalidSignature => Self::AuthenticationError(AuthError::InvalidSignature),
            CheckoutError::DatabaseError(_) => {
                error!("💻️ Database error while handling a request. {e}");
                Self::BackendError("Database error".to_string())
            },
        }
    }
}
