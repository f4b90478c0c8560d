//! Requests understood by the progress API

use serde_json::{Value, json};
use tracing::debug;

use crate::domain::TopicAttempt;

/// HTTP method of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A single call against the progress API, independent of the transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Endpoint path relative to the configured base URL, starting with `/`
    pub path: String,
    /// Trailing path parameter, kept raw; transports must percent-encode it
    pub segment: Option<String>,
    pub body: Option<Value>,
}

impl ApiRequest {
    fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            segment: None,
            body: Some(body),
        }
    }

    fn with_segment(mut self, segment: &str) -> Self {
        self.segment = Some(segment.to_string());
        self
    }

    /// `POST /progress/initialize`
    pub fn initialize(user_id: &str) -> Self {
        debug!(%user_id, "ApiRequest::initialize: called");
        Self::post("/progress/initialize", json!({ "user_id": user_id }))
    }

    /// `POST /progress/record-attempt`
    ///
    /// `user_id` goes into the body as given; callers check it against the
    /// attempt beforehand.
    pub fn record_attempt(attempt: &TopicAttempt, user_id: &str) -> Self {
        debug!(%user_id, topic_id = attempt.topic_id, "ApiRequest::record_attempt: called");
        Self::post(
            "/progress/record-attempt",
            json!({
                "user_id": user_id,
                "stage_id": attempt.stage_id,
                "exercise_id": attempt.exercise_id,
                "topic_id": attempt.topic_id,
                "score": attempt.score,
                "urdu_used": attempt.urdu_used,
                "time_spent_seconds": attempt.time_spent_seconds,
                "completed": attempt.completed,
            }),
        )
    }

    /// `GET /progress/user-progress/{user_id}`
    pub fn user_progress(user_id: &str) -> Self {
        debug!(%user_id, "ApiRequest::user_progress: called");
        Self {
            method: Method::Get,
            path: "/progress/user-progress".to_string(),
            segment: None,
            body: None,
        }
        .with_segment(user_id)
    }

    /// `POST /progress/comprehensive-progress`
    pub fn comprehensive_progress(user_id: &str) -> Self {
        debug!(%user_id, "ApiRequest::comprehensive_progress: called");
        Self::post("/progress/comprehensive-progress", json!({ "user_id": user_id }))
    }

    /// `POST /progress/get-current-topic`
    pub fn current_topic(user_id: &str, stage_id: i64, exercise_id: i64) -> Self {
        debug!(%user_id, stage_id, exercise_id, "ApiRequest::current_topic: called");
        Self::post(
            "/progress/get-current-topic",
            json!({
                "user_id": user_id,
                "stage_id": stage_id,
                "exercise_id": exercise_id,
            }),
        )
    }

    /// `POST /progress/check-unlocks/{user_id}`
    pub fn check_unlocks(user_id: &str) -> Self {
        debug!(%user_id, "ApiRequest::check_unlocks: called");
        Self::post("/progress/check-unlocks", json!({})).with_segment(user_id)
    }
}

impl std::fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if let Some(segment) = &self.segment {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}
