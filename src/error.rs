use thiserror::Error;

/// Errors from the exchange REST client.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Connection(_) | ApiError::RateLimited(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Connection(
                "Request timeout. Please check your internet connection.".to_string(),
            )
        } else if err.is_connect() {
            ApiError::Connection(
                "Failed to connect to Binance API. Please check your internet connection."
                    .to_string(),
            )
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                429 => ApiError::RateLimited(
                    "Too many requests to Binance API. Retry after 60 seconds.".to_string(),
                ),
                418 => ApiError::Connection(
                    "IP address banned by Binance. Please contact support.".to_string(),
                ),
                403 => ApiError::Connection(
                    "WAF limit violated. Please reduce request frequency.".to_string(),
                ),
                500..=599 => ApiError::Connection(format!(
                    "Binance server error (HTTP {}). Please try again later.",
                    status.as_u16()
                )),
                400..=499 => ApiError::InvalidRequest(format!(
                    "Binance rejected the request (HTTP {}).",
                    status.as_u16()
                )),
                _ => ApiError::Internal(format!("HTTP error: {}", status)),
            }
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(format!("JSON parsing failed: {}", err))
    }
}
