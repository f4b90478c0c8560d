//! Transport trait definition

use async_trait::async_trait;
use serde_json::Value;

use super::{ApiError, ApiRequest};

/// Single-shot transport to the progress API
///
/// One call is one network round-trip. Retries, caching and envelope
/// handling live above this trait in the client, which keeps
/// implementations trivial to fake in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the decoded JSON body of a 2xx response
    ///
    /// Non-2xx statuses come back as [`ApiError::Status`].
    async fn execute(&self, request: &ApiRequest) -> Result<Value, ApiError>;
}
