//! Progress client
//!
//! [`ProgressClient`] mediates every progress read and write between UI
//! callers and the progress API:
//!
//! - attempts and exercise references are validated locally before any
//!   network call
//! - every call goes through the fixed-delay [`RetryPolicy`]
//! - reads are cached per user for the cache TTL, and concurrent misses for
//!   the same key share one request
//! - writes, user changes and sign-out clear the cache

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

mod envelope;
mod error;

pub use envelope::Envelope;
pub use error::ProgressError;

use crate::api::{ApiRequest, Transport};
use crate::auth::{AuthProvider, AuthUser};
use crate::cache::{CacheKey, Clock, DEFAULT_TTL, ProgressCache, SystemClock, resource};
use crate::config::Config;
use crate::domain::{
    CurrentTopic, ProgressData, TopicAttempt, UnlockReport, UnlockedContent, UserProgress, ValidationError,
    validate_exercise_ref, validate_stage,
};
use crate::retry::RetryPolicy;

type SharedFetch = Shared<BoxFuture<'static, Result<Value, ProgressError>>>;

/// A read that is currently on the wire
struct InFlight {
    fetch: SharedFetch,
    /// Cache generation when the read started
    generation: u64,
}

#[derive(Debug, Default)]
struct Session {
    user: Option<AuthUser>,
    initialized: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Client-side façade over the progress API
///
/// Construct one per signed-in app session and share it behind an `Arc`.
/// The client resolves the current user lazily on first use.
pub struct ProgressClient {
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthProvider>,
    retry: RetryPolicy,
    session: Mutex<Session>,
    cache: Mutex<ProgressCache>,
    inflight: Mutex<HashMap<CacheKey, InFlight>>,
}

impl ProgressClient {
    /// Create a client with the default retry policy and cache TTL
    pub fn new(transport: Arc<dyn Transport>, auth: Arc<dyn AuthProvider>) -> Self {
        debug!("ProgressClient::new: called");
        Self {
            transport,
            auth,
            retry: RetryPolicy::default(),
            session: Mutex::new(Session::default()),
            cache: Mutex::new(ProgressCache::new(DEFAULT_TTL, Arc::new(SystemClock))),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Create a client with retry and cache settings from config
    pub fn from_config(config: &Config, transport: Arc<dyn Transport>, auth: Arc<dyn AuthProvider>) -> Self {
        debug!("ProgressClient::from_config: called");
        Self::new(transport, auth)
            .with_retry(RetryPolicy::from_config(&config.retry))
            .with_cache(Duration::from_secs(config.cache.ttl_secs), Arc::new(SystemClock))
    }

    /// Set a custom retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set a custom cache TTL and clock
    pub fn with_cache(mut self, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        self.cache = Mutex::new(ProgressCache::new(ttl, clock));
        self
    }

    // ---------------------------------------------------------------------
    // Session lifecycle
    // ---------------------------------------------------------------------

    /// Resolve the current user from the auth provider
    ///
    /// Runs implicitly on the first operation that needs a user.
    pub async fn init(&self) -> Result<(), ProgressError> {
        debug!("init: called");
        let user = self.auth.current_user().await?;
        info!(user_id = ?user.as_ref().map(|u| &u.id), "init: resolved user");
        let mut session = lock(&self.session);
        session.user = user;
        session.initialized = true;
        Ok(())
    }

    /// Re-resolve the user after a sign-in
    ///
    /// Cached data belongs to the previous user, so the whole cache goes.
    pub async fn update_current_user(&self) -> Result<Option<String>, ProgressError> {
        debug!("update_current_user: called");
        self.clear_cache();
        match self.auth.current_user().await {
            Ok(user) => {
                let user_id = user.as_ref().map(|u| u.id.clone());
                info!(?user_id, "update_current_user: switched user");
                let mut session = lock(&self.session);
                session.user = user;
                session.initialized = true;
                Ok(user_id)
            }
            Err(e) => {
                warn!(error = %e, "update_current_user: auth provider failed");
                *lock(&self.session) = Session::default();
                Err(e.into())
            }
        }
    }

    /// Forget the user and everything cached for them
    ///
    /// Operations needing a user fail with [`ProgressError::Unauthenticated`]
    /// until [`update_current_user`](Self::update_current_user) is called.
    pub fn handle_sign_out(&self) {
        info!("handle_sign_out: called");
        {
            let mut session = lock(&self.session);
            session.user = None;
            session.initialized = true;
        }
        self.clear_cache();
    }

    /// Id of the signed-in user, resolving it if needed
    pub async fn current_user_id(&self) -> Option<String> {
        debug!("current_user_id: called");
        self.ensure_user().await.ok().map(|u| u.id)
    }

    pub async fn is_authenticated(&self) -> bool {
        debug!("is_authenticated: called");
        self.ensure_user().await.is_ok()
    }

    /// Drop every cached read and forget in-flight ones
    pub fn clear_cache(&self) {
        debug!("clear_cache: called");
        lock(&self.cache).clear();
        lock(&self.inflight).clear();
    }

    async fn ensure_user(&self) -> Result<AuthUser, ProgressError> {
        {
            let session = lock(&self.session);
            if session.initialized {
                return session.user.clone().ok_or(ProgressError::Unauthenticated);
            }
        }
        debug!("ensure_user: lazy init");
        self.init().await?;
        lock(&self.session).user.clone().ok_or(ProgressError::Unauthenticated)
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Submit a topic attempt
    ///
    /// Invalid attempts are rejected before any network call. On success the
    /// whole cache is cleared, since any aggregate may have changed.
    pub async fn record_topic_attempt(&self, attempt: &TopicAttempt) -> Result<UnlockReport, ProgressError> {
        debug!(
            user_id = %attempt.user_id,
            stage_id = attempt.stage_id,
            exercise_id = attempt.exercise_id,
            topic_id = attempt.topic_id,
            "record_topic_attempt: called"
        );
        attempt.validate()?;
        let user = self.ensure_user().await?;
        if attempt.user_id != user.id {
            warn!(attempt_user = %attempt.user_id, user_id = %user.id, "record_topic_attempt: user mismatch");
            return Err(ValidationError::single("user_id", "does not match the signed-in user").into());
        }

        let value = self.send(ApiRequest::record_attempt(attempt, &user.id)).await?;
        self.clear_cache();

        let report: UnlockReport = decode_or_default(value)?;
        info!(
            topic_id = attempt.topic_id,
            unlocked = report.unlocked_content.len(),
            "record_topic_attempt: recorded"
        );
        Ok(report)
    }

    /// Create the learner's progress rows on the backend
    pub async fn initialize_progress(&self) -> Result<(), ProgressError> {
        debug!("initialize_progress: called");
        let user = self.ensure_user().await?;
        self.send(ApiRequest::initialize(&user.id)).await?;
        self.clear_cache();
        info!(user_id = %user.id, "initialize_progress: initialized");
        Ok(())
    }

    /// Ask the backend to evaluate unlock rules now
    pub async fn check_unlocks(&self) -> Result<Vec<UnlockedContent>, ProgressError> {
        debug!("check_unlocks: called");
        let user = self.ensure_user().await?;
        let value = self.send(ApiRequest::check_unlocks(&user.id)).await?;
        self.clear_cache();
        let report: UnlockReport = decode_or_default(value)?;
        debug!(unlocked = report.unlocked_content.len(), "check_unlocks: done");
        Ok(report.unlocked_content)
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Comprehensive progress, served from cache while fresh
    pub async fn comprehensive_progress(&self) -> Result<ProgressData, ProgressError> {
        debug!("comprehensive_progress: called");
        let user = self.ensure_user().await?;
        let key = CacheKey::new(&user.id, resource::COMPREHENSIVE_PROGRESS);
        let value = self
            .cached_fetch(key.clone(), ApiRequest::comprehensive_progress(&user.id))
            .await?;
        self.decode_cached(&key, value)
    }

    /// Comprehensive progress straight from the backend
    ///
    /// Drops the cached entry first and never joins an in-flight read, so the
    /// caller always gets a live round-trip.
    pub async fn force_refresh_progress(&self) -> Result<ProgressData, ProgressError> {
        info!("force_refresh_progress: called");
        let user = self.ensure_user().await?;
        let key = CacheKey::new(&user.id, resource::COMPREHENSIVE_PROGRESS);
        let generation = {
            let mut cache = lock(&self.cache);
            cache.remove(&key);
            cache.generation()
        };

        let value = self.send(ApiRequest::comprehensive_progress(&user.id)).await?;
        let data: ProgressData = decode(value.clone())?;
        lock(&self.cache).insert_if_current(key, value, generation);
        Ok(data)
    }

    /// Comprehensive progress, or zeroed defaults if it can't be fetched
    pub async fn comprehensive_progress_or_default(&self) -> ProgressData {
        debug!("comprehensive_progress_or_default: called");
        match self.comprehensive_progress().await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "comprehensive_progress_or_default: falling back to defaults");
                ProgressData::default()
            }
        }
    }

    /// Where to resume an exercise; never cached
    pub async fn current_topic_for_exercise(
        &self,
        stage_id: i64,
        exercise_id: i64,
    ) -> Result<CurrentTopic, ProgressError> {
        debug!(stage_id, exercise_id, "current_topic_for_exercise: called");
        validate_exercise_ref(stage_id, exercise_id)?;
        let user = self.ensure_user().await?;
        let value = self
            .send(ApiRequest::current_topic(&user.id, stage_id, exercise_id))
            .await?;
        decode(value)
    }

    /// Raw progress rows, served from cache while fresh
    pub async fn user_progress(&self) -> Result<UserProgress, ProgressError> {
        debug!("user_progress: called");
        let user = self.ensure_user().await?;
        let key = CacheKey::new(&user.id, resource::USER_PROGRESS);
        let value = self.cached_fetch(key.clone(), ApiRequest::user_progress(&user.id)).await?;
        if value.is_null() {
            return Ok(UserProgress::default());
        }
        self.decode_cached(&key, value)
    }

    /// Whether a stage, or an exercise within it, is unlocked for the user
    pub async fn is_content_unlocked(&self, stage_id: i64, exercise_id: Option<i64>) -> Result<bool, ProgressError> {
        debug!(stage_id, ?exercise_id, "is_content_unlocked: called");
        match exercise_id {
            Some(exercise_id) => validate_exercise_ref(stage_id, exercise_id)?,
            None => validate_stage(stage_id)?,
        }
        let progress = self.user_progress().await?;
        Ok(progress.is_unlocked(stage_id, exercise_id))
    }

    // ---------------------------------------------------------------------
    // Plumbing
    // ---------------------------------------------------------------------

    /// One retried, uncached call
    async fn send(&self, request: ApiRequest) -> Result<Value, ProgressError> {
        Self::send_with_retry(self.transport.clone(), self.retry, request).await
    }

    async fn send_with_retry(
        transport: Arc<dyn Transport>,
        retry: RetryPolicy,
        request: ApiRequest,
    ) -> Result<Value, ProgressError> {
        let operation = request.to_string();
        let value = retry.run(&operation, || transport.execute(&request)).await?;
        unwrap_envelope(value)
    }

    /// Cached read; concurrent misses for one key share a single request
    async fn cached_fetch(&self, key: CacheKey, request: ApiRequest) -> Result<Value, ProgressError> {
        let cached = lock(&self.cache).get(&key);
        if let Some(value) = cached {
            return Ok(value);
        }

        let current_generation = lock(&self.cache).generation();
        let (fetch, generation) = {
            let mut inflight = lock(&self.inflight);
            match inflight.get(&key) {
                Some(existing) => {
                    debug!(%key, "cached_fetch: joining in-flight request");
                    (existing.fetch.clone(), existing.generation)
                }
                None => {
                    debug!(%key, "cached_fetch: starting request");
                    let fetch = Self::send_with_retry(self.transport.clone(), self.retry, request)
                        .boxed()
                        .shared();
                    inflight.insert(
                        key.clone(),
                        InFlight {
                            fetch: fetch.clone(),
                            generation: current_generation,
                        },
                    );
                    (fetch, current_generation)
                }
            }
        };

        let result = fetch.clone().await;

        // Every waiter tidies up, so a dropped first caller can't strand the entry
        {
            let mut inflight = lock(&self.inflight);
            if inflight.get(&key).is_some_and(|f| f.fetch.ptr_eq(&fetch)) {
                inflight.remove(&key);
            }
        }
        if let Ok(value) = &result {
            lock(&self.cache).insert_if_current(key, value.clone(), generation);
        }
        result
    }

    /// Decode a cached payload, evicting it if it doesn't decode
    fn decode_cached<T: DeserializeOwned>(&self, key: &CacheKey, value: Value) -> Result<T, ProgressError> {
        decode(value).inspect_err(|e| {
            warn!(%key, error = %e, "decode_cached: undecodable payload, evicting");
            lock(&self.cache).remove(key);
        })
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ProgressError> {
    Ok(serde_json::from_value(value)?)
}

fn decode_or_default<T: DeserializeOwned + Default>(value: Value) -> Result<T, ProgressError> {
    if value.is_null() { Ok(T::default()) } else { decode(value) }
}

/// Strip the backend's `{success, data, error}` wrapper, if present
///
/// `success: false` becomes [`ProgressError::Rejected`]. Bodies without a
/// boolean `success` field pass through untouched.
fn unwrap_envelope(value: Value) -> Result<Value, ProgressError> {
    let mut map = match value {
        Value::Object(map) => map,
        other => return Ok(other),
    };
    let Some(success) = map.get("success").and_then(Value::as_bool) else {
        return Ok(Value::Object(map));
    };
    map.remove("success");

    if success {
        return Ok(match map.remove("data") {
            Some(data) => data,
            None => Value::Object(map),
        });
    }

    let message = map
        .get("error")
        .or_else(|| map.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("request was rejected")
        .to_string();
    debug!(%message, "unwrap_envelope: backend rejected request");
    Err(ProgressError::Rejected(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::api::transport::mock::MockTransport;
    use crate::auth::StaticAuthProvider;
    use crate::cache::ManualClock;
    use crate::domain::ContentType;
    use serde_json::json;

    struct Harness {
        client: ProgressClient,
        transport: Arc<MockTransport>,
        auth: Arc<StaticAuthProvider>,
        clock: Arc<ManualClock>,
    }

    fn progress_body() -> Value {
        json!({
            "success": true,
            "data": {
                "current_stage": { "id": 2, "name": "Stage 2", "subtitle": "Conversations", "progress": 35.0 },
                "streak_days": 3,
                "total_exercises_completed": 4
            }
        })
    }

    fn harness_with(transport: MockTransport) -> Harness {
        let transport = Arc::new(transport);
        let auth = Arc::new(StaticAuthProvider::new(Some(AuthUser::new("u1"))));
        let clock = Arc::new(ManualClock::new());
        let client = ProgressClient::new(transport.clone(), auth.clone())
            .with_retry(RetryPolicy::new(3, Duration::ZERO))
            .with_cache(DEFAULT_TTL, clock.clone());
        Harness {
            client,
            transport,
            auth,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with(MockTransport::new(progress_body()))
    }

    fn attempt() -> TopicAttempt {
        TopicAttempt {
            user_id: "u1".to_string(),
            stage_id: 1,
            exercise_id: 1,
            topic_id: 5,
            score: 85.0,
            urdu_used: false,
            time_spent_seconds: 12,
            completed: true,
        }
    }

    #[tokio::test]
    async fn test_valid_attempt_makes_one_call() {
        let h = harness();
        h.transport.push(Ok(json!({
            "success": true,
            "data": { "unlocked_content": [ { "content_type": "exercise", "stage_id": 1, "exercise_id": 2 } ] }
        })));

        let report = h.client.record_topic_attempt(&attempt()).await.unwrap();

        assert_eq!(h.transport.call_count(), 1);
        assert_eq!(report.unlocked_content.len(), 1);
        assert_eq!(report.unlocked_content[0].content_type, ContentType::Exercise);

        let request = &h.transport.requests()[0];
        assert_eq!(request.path, "/progress/record-attempt");
        assert_eq!(request.body.as_ref().unwrap()["user_id"], "u1");
    }

    #[tokio::test]
    async fn test_invalid_attempt_never_reaches_transport() {
        let h = harness();
        let bad_attempts = vec![
            TopicAttempt {
                stage_id: 7,
                ..attempt()
            },
            TopicAttempt {
                user_id: String::new(),
                ..attempt()
            },
            TopicAttempt {
                exercise_id: 4,
                ..attempt()
            },
            TopicAttempt {
                topic_id: 0,
                ..attempt()
            },
            TopicAttempt {
                score: -0.5,
                ..attempt()
            },
            TopicAttempt {
                time_spent_seconds: 3601,
                ..attempt()
            },
        ];

        for bad in bad_attempts {
            let result = h.client.record_topic_attempt(&bad).await;
            assert!(result.unwrap_err().is_validation());

            let envelope: Envelope<UnlockReport> = h.client.record_topic_attempt(&bad).await.into();
            assert!(!envelope.success);
        }
        assert_eq!(h.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_attempt_for_other_user_rejected_locally() {
        let h = harness();
        let other = TopicAttempt {
            user_id: "someone-else".to_string(),
            ..attempt()
        };

        let err = h.client.record_topic_attempt(&other).await.unwrap_err();

        match err {
            ProgressError::Validation(v) => assert!(v.has_field("user_id")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(h.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_avoids_network() {
        let h = harness();

        let first = h.client.comprehensive_progress().await.unwrap();
        let second = h.client.comprehensive_progress().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.streak_days, 3);
        assert_eq!(first.current_stage.id, 2);
        assert_eq!(h.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_write_invalidates_cache() {
        let h = harness();

        h.client.comprehensive_progress().await.unwrap();
        h.client.record_topic_attempt(&attempt()).await.unwrap();
        h.client.comprehensive_progress().await.unwrap();

        assert_eq!(h.transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_ttl_expiry_refetches() {
        let h = harness();

        h.client.comprehensive_progress().await.unwrap();
        h.clock.advance(Duration::from_secs(4 * 60 + 59));
        h.client.comprehensive_progress().await.unwrap();
        assert_eq!(h.transport.call_count(), 1);

        h.clock.advance(Duration::from_secs(1));
        h.client.comprehensive_progress().await.unwrap();
        assert_eq!(h.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_user_switch_clears_cache() {
        let h = harness();

        h.client.comprehensive_progress().await.unwrap();
        h.client.user_progress().await.unwrap();
        assert_eq!(h.transport.call_count(), 2);

        h.auth.sign_in(AuthUser::new("u2"));
        let switched = h.client.update_current_user().await.unwrap();
        assert_eq!(switched.as_deref(), Some("u2"));

        h.client.comprehensive_progress().await.unwrap();
        h.client.user_progress().await.unwrap();
        assert_eq!(h.transport.call_count(), 4);

        let requests = h.transport.requests();
        assert_eq!(requests[2].body.as_ref().unwrap()["user_id"], "u2");
        assert_eq!(requests[3].to_string(), "GET /progress/user-progress/u2");
    }

    #[tokio::test]
    async fn test_same_user_refresh_still_clears_cache() {
        let h = harness();

        h.client.comprehensive_progress().await.unwrap();
        h.client.update_current_user().await.unwrap();
        h.client.comprehensive_progress().await.unwrap();

        assert_eq!(h.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_third_attempt() {
        let h = harness();
        h.transport.fail_times(2);

        let data = h.client.comprehensive_progress().await.unwrap();

        assert_eq!(data.streak_days, 3);
        assert_eq!(h.transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausts_after_three_attempts() {
        let h = harness();
        h.transport.fail_times(10);

        let envelope: Envelope<ProgressData> = h.client.comprehensive_progress().await.into();

        assert!(!envelope.success);
        assert!(envelope.error.unwrap().contains("503"));
        assert_eq!(h.transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache_and_reports_error() {
        let h = harness();
        h.client.comprehensive_progress().await.unwrap();
        h.transport.fail_times(3);

        let err = h.client.record_topic_attempt(&attempt()).await.unwrap_err();
        assert!(matches!(err, ProgressError::Api(_)));

        h.client.comprehensive_progress().await.unwrap();
        // 1 read + 3 failed write attempts, second read from cache
        assert_eq!(h.transport.call_count(), 4);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let h = harness();

        h.client.comprehensive_progress().await.unwrap();
        h.client.force_refresh_progress().await.unwrap();
        assert_eq!(h.transport.call_count(), 2);

        // The refreshed value is cached again
        h.client.comprehensive_progress().await.unwrap();
        assert_eq!(h.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_sign_out_requires_new_user() {
        let h = harness();
        h.client.comprehensive_progress().await.unwrap();

        h.client.handle_sign_out();
        assert!(!h.client.is_authenticated().await);
        assert_eq!(h.client.current_user_id().await, None);

        let err = h.client.comprehensive_progress().await.unwrap_err();
        assert!(err.is_unauthenticated());
        assert_eq!(h.transport.call_count(), 1);

        h.auth.sign_in(AuthUser::new("u3"));
        h.client.update_current_user().await.unwrap();
        assert_eq!(h.client.current_user_id().await.as_deref(), Some("u3"));
        h.client.comprehensive_progress().await.unwrap();
        assert_eq!(h.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_no_user_is_unauthenticated() {
        let transport = Arc::new(MockTransport::new(progress_body()));
        let client = ProgressClient::new(transport.clone(), Arc::new(StaticAuthProvider::default()))
            .with_retry(RetryPolicy::new(3, Duration::ZERO));

        assert!(client.comprehensive_progress().await.unwrap_err().is_unauthenticated());
        assert!(client.record_topic_attempt(&attempt()).await.unwrap_err().is_unauthenticated());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_lazy_init_picks_up_user() {
        let h = harness();
        assert!(h.client.is_authenticated().await);
        assert_eq!(h.client.current_user_id().await.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_current_topic_is_validated_and_not_cached() {
        let h = harness();
        h.transport.push(Ok(json!({
            "success": true,
            "data": { "current_topic_id": 7, "is_new_exercise": false, "is_completed": false }
        })));

        let err = h.client.current_topic_for_exercise(7, 1).await.unwrap_err();
        assert!(err.is_validation());
        assert!(h.client.current_topic_for_exercise(1, 0).await.is_err());
        assert_eq!(h.transport.call_count(), 0);

        let topic = h.client.current_topic_for_exercise(2, 3).await.unwrap();
        assert_eq!(topic.current_topic_id, 7);

        h.client.current_topic_for_exercise(2, 3).await.unwrap();
        assert_eq!(h.transport.call_count(), 2);

        let body = h.transport.requests()[0].body.clone().unwrap();
        assert_eq!(body, json!({ "user_id": "u1", "stage_id": 2, "exercise_id": 3 }));
    }

    #[tokio::test]
    async fn test_backend_rejection_not_retried() {
        let h = harness();
        h.transport.push(Ok(json!({ "success": false, "error": "Topic not found" })));

        let err = h.client.record_topic_attempt(&attempt()).await.unwrap_err();

        assert!(matches!(err, ProgressError::Rejected(ref m) if m == "Topic not found"));
        assert_eq!(h.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_request() {
        let h = harness_with(MockTransport::new(progress_body()).with_delay(Duration::from_millis(20)));

        let (a, b, c) = tokio::join!(
            h.client.comprehensive_progress(),
            h.client.comprehensive_progress(),
            h.client.comprehensive_progress(),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert!(c.is_ok());
        assert_eq!(h.transport.call_count(), 1);

        h.client.comprehensive_progress().await.unwrap();
        assert_eq!(h.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_during_read_discards_result() {
        let h = harness_with(MockTransport::new(progress_body()).with_delay(Duration::from_millis(20)));

        let (read, _) = tokio::join!(h.client.comprehensive_progress(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            h.client.clear_cache();
        });
        assert!(read.is_ok());

        // The read that raced the clear must not have repopulated the cache
        h.client.comprehensive_progress().await.unwrap();
        assert_eq!(h.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_is_content_unlocked_uses_cached_rows() {
        let h = harness();
        h.transport.push(Ok(json!({
            "success": true,
            "data": {
                "summary": { "total_topics": 12 },
                "stages": [],
                "exercises": [],
                "unlocks": [
                    { "stage_id": 1, "exercise_id": null, "is_unlocked": true },
                    { "stage_id": 1, "exercise_id": 1, "is_unlocked": true },
                    { "stage_id": 1, "exercise_id": 2, "is_unlocked": false }
                ]
            }
        })));

        assert!(h.client.is_content_unlocked(1, None).await.unwrap());
        assert!(h.client.is_content_unlocked(1, Some(1)).await.unwrap());
        assert!(!h.client.is_content_unlocked(1, Some(2)).await.unwrap());
        assert!(!h.client.is_content_unlocked(2, None).await.unwrap());
        assert_eq!(h.transport.call_count(), 1);

        assert!(h.client.is_content_unlocked(9, None).await.unwrap_err().is_validation());
        assert_eq!(h.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_check_unlocks_clears_cache() {
        let h = harness();
        h.client.comprehensive_progress().await.unwrap();
        h.transport.push(Ok(json!({
            "unlocked_content": [ { "content_type": "stage", "stage_id": 2 } ]
        })));

        let unlocked = h.client.check_unlocks().await.unwrap();
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].to_string(), "stage 2");

        h.client.comprehensive_progress().await.unwrap();
        assert_eq!(h.transport.call_count(), 3);
        assert_eq!(h.transport.requests()[1].to_string(), "POST /progress/check-unlocks/u1");
    }

    #[tokio::test]
    async fn test_initialize_progress() {
        let h = harness();
        h.transport.push(Ok(json!({ "success": true, "data": null })));

        h.client.initialize_progress().await.unwrap();

        let request = &h.transport.requests()[0];
        assert_eq!(request.path, "/progress/initialize");
        assert_eq!(request.body, Some(json!({ "user_id": "u1" })));
    }

    #[tokio::test]
    async fn test_progress_or_default_on_failure() {
        let h = harness();
        h.transport.fail_times(3);

        let data = h.client.comprehensive_progress_or_default().await;

        assert_eq!(data, ProgressData::default());
        assert_eq!(h.transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_evicted() {
        let h = harness();
        h.transport.push(Ok(json!({ "success": true, "data": [1, 2, 3] })));

        assert!(h.client.comprehensive_progress().await.is_err());
        assert!(h.client.comprehensive_progress().await.is_ok());
        assert_eq!(h.transport.call_count(), 2);
    }

    #[test]
    fn test_unwrap_envelope() {
        assert_eq!(unwrap_envelope(json!({ "success": true, "data": 5 })).unwrap(), json!(5));
        assert_eq!(
            unwrap_envelope(json!({ "success": true, "unlocked_content": [] })).unwrap(),
            json!({ "unlocked_content": [] })
        );
        assert_eq!(unwrap_envelope(json!({ "a": 1 })).unwrap(), json!({ "a": 1 }));
        assert_eq!(unwrap_envelope(json!([1])).unwrap(), json!([1]));

        let err = unwrap_envelope(json!({ "success": false, "message": "nope" })).unwrap_err();
        assert!(matches!(err, ProgressError::Rejected(ref m) if m == "nope"));
    }

    #[test]
    fn test_api_error_converts() {
        let err: ProgressError = ApiError::InvalidResponse("x".to_string()).into();
        assert!(!err.is_local());
    }
}
