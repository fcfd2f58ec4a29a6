use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use dishdash_engine::{
    cart::CartError,
    session::SessionError,
    AuthApiError,
    AvailabilityApiError,
    CartApiError,
    CheckoutError,
    OrderFlowError,
    PaymentApiError,
    PaymentProviderError,
    ACCESS_DENIED,
};
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
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PaymentError(String),
    #[error("Payment gateway error. {0}")]
    GatewayError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::CouldNotIssueToken(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNAUTHORIZED,
            },
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentError(_) => StatusCode::PAYMENT_REQUIRED,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
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
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token has expired.")]
    TokenExpired,
    #[error("Access token has been revoked. Please sign in again.")]
    TokenRevoked,
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Could not issue access token. {0}")]
    CouldNotIssueToken(String),
}

fn access_denied() -> ServerError {
    ServerError::InsufficientPermissions(ACCESS_DENIED.to_string())
}

fn backend(e: String) -> ServerError {
    error!("💻️ Backend error: {e}");
    ServerError::BackendError(e)
}

impl From<AuthApiError> for ServerError {
    fn from(e: AuthApiError) -> Self {
        match e {
            AuthApiError::DatabaseError(s) => backend(s),
            AuthApiError::DuplicateEmail => Self::Conflict(e.to_string()),
            AuthApiError::InvalidCredentials => Self::AuthenticationError(AuthError::InvalidCredentials),
            AuthApiError::InvalidDetails(_) => Self::ValidationError(e.to_string()),
            AuthApiError::ProfileNotFound(_) => Self::NoRecordFound(e.to_string()),
        }
    }
}

impl From<SessionError> for ServerError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::CheckoutInProgress | SessionError::ItemUnavailable(_) => Self::Conflict(e.to_string()),
            SessionError::Cart(CartError::ItemNotInCart(_)) => Self::NoRecordFound(e.to_string()),
            SessionError::Cart(CartError::RestaurantMismatch { .. } | CartError::QuantityTooLarge { .. }) => {
                Self::ValidationError(e.to_string())
            },
        }
    }
}

impl From<CartApiError> for ServerError {
    fn from(e: CartApiError) -> Self {
        match e {
            CartApiError::AccessDenied => access_denied(),
            CartApiError::ItemNotFound(_) => Self::NoRecordFound(e.to_string()),
            CartApiError::Session(e) => e.into(),
            CartApiError::DatabaseError(s) => backend(s),
        }
    }
}

impl From<AvailabilityApiError> for ServerError {
    fn from(e: AvailabilityApiError) -> Self {
        match e {
            AvailabilityApiError::AccessDenied => access_denied(),
            AvailabilityApiError::EmptyCart => Self::ValidationError(e.to_string()),
            AvailabilityApiError::RequestAlreadyResolved(_) => Self::Conflict(e.to_string()),
            AvailabilityApiError::Session(e) => e.into(),
            AvailabilityApiError::DatabaseError(s) => backend(s),
        }
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::AccessDenied => access_denied(),
            OrderFlowError::MissingDeliveryDetails => Self::ValidationError(e.to_string()),
            OrderFlowError::PaymentAmountMismatch { .. } => Self::PaymentError(e.to_string()),
            OrderFlowError::CannotPlaceOrder(_) |
            OrderFlowError::StatusUnchanged(_) |
            OrderFlowError::InvalidStatusTransition { .. } => Self::Conflict(e.to_string()),
            OrderFlowError::Session(e) => e.into(),
            OrderFlowError::DatabaseError(s) => backend(s),
        }
    }
}

impl From<PaymentApiError> for ServerError {
    fn from(e: PaymentApiError) -> Self {
        match e {
            PaymentApiError::AccessDenied => access_denied(),
            PaymentApiError::InvalidAmount(_) | PaymentApiError::BelowPlatformFee { .. } => {
                Self::ValidationError(e.to_string())
            },
            PaymentApiError::VerificationFailed |
            PaymentApiError::IntentAlreadyUsed(_) |
            PaymentApiError::AmountMismatch { .. } |
            PaymentApiError::PaymentNotCompleted(_) => Self::PaymentError(e.to_string()),
            PaymentApiError::Gateway(PaymentProviderError::NotFound(_)) => Self::PaymentError(e.to_string()),
            PaymentApiError::Gateway(_) => Self::GatewayError(e.to_string()),
            PaymentApiError::DatabaseError(s) => backend(s),
        }
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::Payment(e) => e.into(),
            CheckoutError::Order(e) => e.into(),
            CheckoutError::Session(e) => e.into(),
        }
    }
}
