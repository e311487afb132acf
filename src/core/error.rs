use thiserror::Error;

/// Centralized error types for the service.
///
/// Every store and platform-call failure is translated to one of these
/// at the operation boundary; handlers map them to HTTP responses and
/// nothing is allowed to crash the process.
#[derive(Error, Debug)]
pub enum AppError {
    /// Mini App init data failed the keyed-hash check
    #[error("init data verification failed")]
    Authenticity,

    /// Acting principal is not the configured admin
    #[error("not allowed")]
    Authorization,

    /// Job id unknown after exhausting retries and the raw-cell fallback
    #[error("job not found")]
    NotFound,

    /// Row store read/write failure not resolved by retry
    #[error("store error: {0}")]
    Store(String),

    /// Failed to reach the messaging platform
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Outbound HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed inbound payloads
    #[error("validation error: {0}")]
    Validation(String),

    /// Anyhow errors (for general error handling)
    #[error("application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status this error surfaces as.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Authenticity | AppError::Validation(_) => 400,
            AppError::Authorization => 403,
            AppError::NotFound => 404,
            _ => 500,
        }
    }

    /// Short machine-readable error tag for JSON responses.
    pub fn tag(&self) -> &'static str {
        match self {
            AppError::Authenticity => "invalid_init_data",
            AppError::Authorization => "forbidden",
            AppError::NotFound => "not_found",
            AppError::Validation(_) => "bad_request",
            AppError::Store(_) => "sheet_error",
            AppError::Delivery(_) | AppError::Telegram(_) => "send_failed",
            _ => "internal_error",
        }
    }
}
