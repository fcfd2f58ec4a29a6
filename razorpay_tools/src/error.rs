use thiserror::Error;

#[derive(Debug, Error)]
pub enum RazorpayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach Razorpay: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl RazorpayApiError {
    /// True for failures where Razorpay never gave an answer, as opposed to answering with an error.
    pub fn is_transport_error(&self) -> bool {
        match self {
            Self::RestResponseError(_) | Self::Initialization(_) => true,
            Self::QueryError { status, .. } => *status >= 500,
            Self::JsonError(_) => false,
        }
    }
}
