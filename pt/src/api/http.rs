//! HTTP transport for the progress API
//!
//! Implements the Transport trait over reqwest. Each call is exactly one
//! round-trip; the client layers retry on top.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{ApiError, ApiRequest, Method, Transport};
use crate::config::ApiConfig;

/// reqwest-backed progress API transport
pub struct HttpTransport {
    base_url: Url,
    token: Option<String>,
    http: Client,
}

impl HttpTransport {
    /// Create a new transport from configuration
    ///
    /// Reads the bearer token from the environment variable named in config,
    /// if it is set.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        debug!(?config, "from_config: called");
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(ApiError::Network)?;

        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        Ok(Self {
            base_url,
            token: config.get_token(),
            http,
        })
    }

    /// Full URL for a request, with the path parameter percent-encoded
    fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?;
            segments
                .pop_if_empty()
                .extend(request.path.split('/').filter(|s| !s.is_empty()));
            if let Some(segment) = &request.segment {
                segments.push(segment);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let url = self.url_for(request)?;
        debug!(%url, method = %request.method, "execute: called");

        let mut builder = match request.method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
        };
        builder = builder.header("accept", "application/json");
        if let Some(token) = &self.token {
            debug!("execute: attaching bearer token");
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "execute: API error");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: text,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            debug!("execute: empty body");
            return Ok(Value::Null);
        }

        debug!(body_len = text.len(), "execute: success");
        Ok(serde_json::from_str(&text)?)
    }
}
