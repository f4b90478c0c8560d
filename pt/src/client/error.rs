//! Client error types

use std::sync::Arc;

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;
use crate::domain::ValidationError;

/// Errors returned by [`ProgressClient`](super::ProgressClient) operations
///
/// Cheap to clone so one failed in-flight fetch can be handed to every
/// caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ProgressError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Not signed in")]
    Unauthenticated,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(Arc<ApiError>),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl From<ApiError> for ProgressError {
    fn from(err: ApiError) -> Self {
        ProgressError::Api(Arc::new(err))
    }
}

impl From<serde_json::Error> for ProgressError {
    fn from(err: serde_json::Error) -> Self {
        ProgressError::Api(Arc::new(ApiError::Json(err)))
    }
}

impl ProgressError {
    /// Check if the request never left the process
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ProgressError::Validation(_) | ProgressError::Unauthenticated | ProgressError::Auth(_)
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ProgressError::Validation(_))
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ProgressError::Unauthenticated)
    }
}
