//! progresstracker - client-side learner progress tracking
//!
//! Mediates progress reads and writes between a learning app's screens and
//! the remote progress API.
//!
//! # Core Concepts
//!
//! - **Fail Fast Locally**: Attempts are validated before any network call
//! - **Fixed Retry**: Every call gets a bounded number of attempts with a constant delay
//! - **Per-User Cache**: Reads are cached per user with a short TTL; writes clear it
//! - **Errors Are Values**: Operations return results, never panic into the UI
//!
//! # Modules
//!
//! - [`client`] - The [`ProgressClient`] façade
//! - [`domain`] - Attempts, progress summaries and unlock data
//! - [`api`] - Endpoint descriptions and the HTTP transport
//! - [`cache`] - TTL cache keyed by user and resource
//! - [`retry`] - Fixed-delay retry policy
//! - [`auth`] - Current user resolution
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod api;
pub mod auth;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod domain;
pub mod retry;

// Re-export commonly used types
pub use api::{ApiError, ApiRequest, HttpTransport, Transport, create_transport};
pub use auth::{AuthError, AuthProvider, AuthUser, StaticAuthProvider};
pub use cache::{CacheKey, Clock, ManualClock, ProgressCache, SystemClock};
pub use client::{Envelope, ProgressClient, ProgressError};
pub use config::Config;
pub use domain::{
    CurrentTopic, ExerciseStatus, ProgressData, TopicAttempt, UnlockReport, UnlockedContent, UserProgress,
    ValidationError,
};
pub use retry::RetryPolicy;
