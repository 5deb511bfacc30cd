use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Validation errors for request fields and business rules
    #[error("Validation error: {0}")]
    Validation(String),

    /// Credential or access-token failure against the gateway
    #[error("Gateway authentication failed: {0}")]
    Auth(String),

    /// Transport failure talking to the gateway (retryable by starting a new attempt)
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Gateway synchronously refused a push request
    #[error("Gateway rejected request: {description}")]
    GatewayRejected {
        description: String,
        code: Option<String>,
    },

    /// Gateway has not resolved the attempt yet
    #[error("Transaction is still being processed")]
    StillProcessing,

    /// Status query failed for any reason other than "still processing"
    #[error("Status query failed: {0}")]
    QueryFailed(String),

    /// A result referenced a correlation id the store has never seen
    #[error("Unknown correlation id: {0}")]
    UnknownCorrelation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Register operation attempted without an open session
    #[error("Register is closed: {0}")]
    RegisterClosed(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        if matches!(self, AppError::StillProcessing) {
            return HttpResponse::build(status_code).json(serde_json::json!({
                "error": "still processing",
            }));
        }

        let message = match self {
            AppError::GatewayRejected { description, .. } => description.clone(),
            AppError::Database(_) | AppError::Internal(_) | AppError::Configuration(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(status_code).json(serde_json::json!({
            "error": message,
            "code": self.code(),
            "retryable": self.is_retryable(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::GatewayRejected { .. } => StatusCode::BAD_REQUEST,
            AppError::StillProcessing => StatusCode::OK,
            AppError::QueryFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::UnknownCorrelation(_) => StatusCode::NOT_FOUND,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RegisterClosed(_) => StatusCode::CONFLICT,
            AppError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Helper functions for common error scenarios
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        AppError::Auth(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        AppError::GatewayUnavailable(msg.into())
    }

    pub fn rejected(description: impl Into<String>, code: Option<String>) -> Self {
        AppError::GatewayRejected {
            description: description.into(),
            code,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            AppError::GatewayRejected { .. } => "GATEWAY_REJECTED",
            AppError::StillProcessing => "STILL_PROCESSING",
            AppError::QueryFailed(_) => "QUERY_FAILED",
            AppError::UnknownCorrelation(_) => "UNKNOWN_CORRELATION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::RegisterClosed(_) => "REGISTER_CLOSED",
            AppError::RateLimitExceeded(_) => "RATE_LIMITED",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Json(_) => "INVALID_JSON",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the till may offer a retry: a fresh push for a failed
    /// start, or another status check for a failed query
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::GatewayUnavailable(_) | AppError::StillProcessing | AppError::QueryFailed(_)
        )
    }

    /// Text safe to show to a cashier
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Auth(_) => {
                "M-Pesa authentication failed. Please check your credentials.".to_string()
            }
            AppError::GatewayUnavailable(_) => "Network error. Please try again later.".to_string(),
            AppError::GatewayRejected { description, .. } => description.clone(),
            AppError::StillProcessing => "Waiting for the customer to confirm".to_string(),
            AppError::QueryFailed(_) => {
                "Error checking payment status. Please try again.".to_string()
            }
            AppError::RegisterClosed(_) => {
                "Please ensure the register is open before processing payments".to_string()
            }
            _ => "Something went wrong while processing the payment".to_string(),
        }
    }
}
