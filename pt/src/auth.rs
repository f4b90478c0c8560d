//! Resolution of the signed-in user
//!
//! The auth protocol itself belongs to the identity provider; the client only
//! needs "who is signed in right now", which [`AuthProvider`] answers.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AuthConfig;

/// The signed-in learner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl AuthUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Errors from the identity provider
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Auth provider unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid session: {0}")]
    InvalidSession(String),
}

/// Source of the current user
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The signed-in user, or `None` when nobody is signed in
    async fn current_user(&self) -> Result<Option<AuthUser>, AuthError>;
}

/// Session held in memory
///
/// Seeded from config or the environment for the CLI; `sign_in` and
/// `sign_out` switch it at runtime.
#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    user: Mutex<Option<AuthUser>>,
}

impl StaticAuthProvider {
    pub fn new(user: Option<AuthUser>) -> Self {
        Self { user: Mutex::new(user) }
    }

    /// Resolve the user id from config
    ///
    /// An explicit `user-id` wins; otherwise the variable named by
    /// `user-id-env` is read. Blank values count as signed out.
    pub fn from_config(config: &AuthConfig) -> Self {
        debug!(?config, "from_config: called");
        let id = config
            .user_id
            .clone()
            .or_else(|| std::env::var(&config.user_id_env).ok())
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let user = id.map(|id| {
            let user = AuthUser::new(id);
            match &config.email {
                Some(email) => user.with_email(email.clone()),
                None => user,
            }
        });

        Self::new(user)
    }

    pub fn sign_in(&self, user: AuthUser) {
        info!(user_id = %user.id, "sign_in: called");
        *self.user.lock().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    pub fn sign_out(&self) {
        info!("sign_out: called");
        *self.user.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn current_user(&self) -> Result<Option<AuthUser>, AuthError> {
        let user = self.user.lock().unwrap_or_else(PoisonError::into_inner).clone();
        debug!(user_id = ?user.as_ref().map(|u| &u.id), "current_user: called");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let auth = StaticAuthProvider::default();
        assert_eq!(auth.current_user().await.unwrap(), None);

        auth.sign_in(AuthUser::new("u1"));
        assert_eq!(auth.current_user().await.unwrap().unwrap().id, "u1");

        auth.sign_out();
        assert_eq!(auth.current_user().await.unwrap(), None);
    }

    #[tokio::test]
    #[serial]
    async fn test_from_config_prefers_explicit_id() {
        // SAFETY: serialized with the other env-mutating tests
        unsafe { std::env::set_var("PT_TEST_USER_ID", "from-env") };
        let config = AuthConfig {
            user_id: Some("from-config".to_string()),
            user_id_env: "PT_TEST_USER_ID".to_string(),
            email: Some("learner@example.com".to_string()),
        };

        let user = StaticAuthProvider::from_config(&config).current_user().await.unwrap().unwrap();
        assert_eq!(user.id, "from-config");
        assert_eq!(user.email.as_deref(), Some("learner@example.com"));
        unsafe { std::env::remove_var("PT_TEST_USER_ID") };
    }

    #[tokio::test]
    #[serial]
    async fn test_from_config_falls_back_to_env() {
        unsafe { std::env::set_var("PT_TEST_USER_ID", "  from-env  ") };
        let config = AuthConfig {
            user_id: None,
            user_id_env: "PT_TEST_USER_ID".to_string(),
            email: None,
        };

        let user = StaticAuthProvider::from_config(&config).current_user().await.unwrap().unwrap();
        assert_eq!(user.id, "from-env");
        unsafe { std::env::remove_var("PT_TEST_USER_ID") };
    }

    #[tokio::test]
    #[serial]
    async fn test_from_config_blank_is_signed_out() {
        unsafe { std::env::set_var("PT_TEST_USER_ID", "   ") };
        let config = AuthConfig {
            user_id: None,
            user_id_env: "PT_TEST_USER_ID".to_string(),
            email: None,
        };

        assert!(StaticAuthProvider::from_config(&config).current_user().await.unwrap().is_none());
        unsafe { std::env::remove_var("PT_TEST_USER_ID") };
    }
}
