//! Progress API error types

use thiserror::Error;

/// Errors that can occur while talking to the progress API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Check if this error is retryable
    ///
    /// Any non-2xx status and any transport failure is retried; a body we
    /// can't make sense of will not improve on a second try.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Status { .. } => true,
            ApiError::Network(_) => true,
            ApiError::InvalidResponse(_) => false,
            ApiError::Json(_) => false,
            ApiError::InvalidUrl(_) => false,
        }
    }

    /// HTTP status, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        // Server errors should be retryable
        assert!(
            ApiError::Status {
                status: 503,
                message: "Service unavailable".to_string()
            }
            .is_retryable()
        );

        // Client errors too: any non-2xx counts
        assert!(
            ApiError::Status {
                status: 404,
                message: "Not found".to_string()
            }
            .is_retryable()
        );

        // Invalid response should not be retryable
        assert!(!ApiError::InvalidResponse("Bad JSON".to_string()).is_retryable());

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!ApiError::Json(json_err).is_retryable());

        assert!(!ApiError::InvalidUrl("http://".to_string()).is_retryable());
    }

    #[test]
    fn test_status() {
        let err = ApiError::Status {
            status: 500,
            message: "Server error".to_string(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(ApiError::InvalidResponse("x".to_string()).status(), None);
    }

    #[test]
    fn test_display() {
        let err = ApiError::Status {
            status: 502,
            message: "Bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "API error 502: Bad gateway");
    }
}
