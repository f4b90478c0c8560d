//! Progress API access
//!
//! Describes the remote endpoints ([`ApiRequest`]) and the seam used to reach
//! them ([`Transport`]), with a reqwest implementation in [`HttpTransport`].

use std::sync::Arc;

use tracing::debug;

mod error;
mod http;
mod request;
pub mod transport;

pub use error::ApiError;
pub use http::HttpTransport;
pub use request::{ApiRequest, Method};
pub use transport::Transport;

use crate::config::ApiConfig;

/// Create the HTTP transport described by config
pub fn create_transport(config: &ApiConfig) -> Result<Arc<dyn Transport>, ApiError> {
    debug!(base_url = %config.base_url, "create_transport: called");
    Ok(Arc::new(HttpTransport::from_config(config)?))
}
