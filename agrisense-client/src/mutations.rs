//! Session mutations: login, register, logout.
//!
//! Each mutation takes a cache generation before its request goes out and
//! writes at that generation afterwards, so overlapping mutations land in
//! the order they were issued. Failures never touch the cache.

use crate::messages::messages_for;
use crate::notifications::NotificationLevel;
use crate::session::SessionContext;
use agrisense_cache::Generation;
use agrisense_core::{Credentials, Identity, Registration, ValidationError};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Login,
    Register,
    Logout,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::Login => "login",
            MutationKind::Register => "register",
            MutationKind::Logout => "logout",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Input failed local checks; nothing was sent.
    Invalid,
    /// The server refused or could not be reached.
    Rejected,
    /// Succeeded remotely, but a later mutation already owns the session entry.
    Superseded,
}

/// A recovered mutation failure. `message` is safe to show to users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} failed: {message}")]
pub struct MutationError {
    pub kind: MutationKind,
    pub reason: FailureReason,
    pub message: String,
}

impl MutationError {
    fn new(kind: MutationKind, reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            kind,
            reason,
            message: message.into(),
        }
    }
}

impl SessionContext {
    pub async fn login(&self, credentials: &Credentials) -> Result<Identity, MutationError> {
        let kind = MutationKind::Login;
        let messages = messages_for(self.role());
        if let Err(err) = credentials.validate() {
            return Err(self.invalid(kind, err));
        }

        let generation = self.cache().issue_generation();
        let result = self
            .client()
            .post_json(&self.role().login_path(), credentials)
            .await
            .and_then(|value| Identity::require(self.role(), &value));

        match result {
            Ok(identity) => {
                self.apply(kind, generation, identity.to_value())?;
                tracing::info!(
                    role = %self.role(),
                    username = %identity.username(),
                    "Login succeeded"
                );
                self.notifications().push(
                    NotificationLevel::Success,
                    messages.login_success_title,
                    messages.welcome_back(identity.display_name()),
                );
                Ok(identity)
            }
            Err(err) => {
                tracing::warn!(
                    role = %self.role(),
                    status = ?err.status_code(),
                    "Login rejected"
                );
                tracing::debug!(error = %err, "Login failure detail");
                self.notifications().push(
                    NotificationLevel::Error,
                    messages.login_failure_title,
                    messages.login_failure_description,
                );
                Err(MutationError::new(
                    kind,
                    FailureReason::Rejected,
                    messages.login_failure_description,
                ))
            }
        }
    }

    pub async fn register(&self, registration: &Registration) -> Result<Identity, MutationError> {
        let kind = MutationKind::Register;
        let messages = messages_for(self.role());
        if registration.role() != self.role() {
            let err = ValidationError::InvalidValue {
                field: "role".to_string(),
                reason: format!(
                    "{} profile submitted to the {} session",
                    registration.role(),
                    self.role()
                ),
            };
            return Err(self.invalid(kind, err));
        }
        if let Err(err) = registration.validate() {
            return Err(self.invalid(kind, err));
        }

        let generation = self.cache().issue_generation();
        let result = self
            .client()
            .post_json(&self.role().register_path(), registration)
            .await
            .and_then(|value| Identity::require(self.role(), &value));

        match result {
            Ok(identity) => {
                self.apply(kind, generation, identity.to_value())?;
                tracing::info!(
                    role = %self.role(),
                    username = %identity.username(),
                    "Registration succeeded"
                );
                self.notifications().push(
                    NotificationLevel::Success,
                    messages.register_success_title,
                    messages.welcome_new(identity.display_name()),
                );
                Ok(identity)
            }
            Err(err) => {
                tracing::warn!(
                    role = %self.role(),
                    status = ?err.status_code(),
                    "Registration rejected"
                );
                tracing::debug!(error = %err, "Registration failure detail");
                self.notifications().push(
                    NotificationLevel::Error,
                    messages.register_failure_title,
                    messages.register_failure_description,
                );
                Err(MutationError::new(
                    kind,
                    FailureReason::Rejected,
                    messages.register_failure_description,
                ))
            }
        }
    }

    /// End the session. The entry is set to `null` rather than removed, so
    /// readers see "known absent" instead of triggering a fresh check.
    pub async fn logout(&self) -> Result<(), MutationError> {
        let kind = MutationKind::Logout;
        let messages = messages_for(self.role());
        let generation = self.cache().issue_generation();

        match self.client().post_discard(&self.role().logout_path()).await {
            Ok(()) => {
                self.apply(kind, generation, Value::Null)?;
                tracing::info!(role = %self.role(), "Logout succeeded");
                self.notifications().push(
                    NotificationLevel::Success,
                    messages.logout_success_title,
                    messages.logout_success_description,
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    role = %self.role(),
                    status = ?err.status_code(),
                    "Logout rejected"
                );
                tracing::debug!(error = %err, "Logout failure detail");
                self.notifications().push(
                    NotificationLevel::Error,
                    messages.logout_failure_title,
                    messages.logout_failure_description,
                );
                Err(MutationError::new(
                    kind,
                    FailureReason::Rejected,
                    messages.logout_failure_description,
                ))
            }
        }
    }

    fn apply(
        &self,
        kind: MutationKind,
        generation: Generation,
        value: Value,
    ) -> Result<(), MutationError> {
        if self.cache().write_at(self.key(), generation, value) {
            return Ok(());
        }
        tracing::debug!(
            role = %self.role(),
            mutation = %kind,
            generation = %generation,
            "Mutation result superseded by a later mutation"
        );
        Err(MutationError::new(
            kind,
            FailureReason::Superseded,
            "superseded by a later session change",
        ))
    }

    fn invalid(&self, kind: MutationKind, err: ValidationError) -> MutationError {
        let messages = messages_for(self.role());
        let message = err.to_string();
        tracing::debug!(role = %self.role(), mutation = %kind, reason = %message, "Invalid input");
        self.notifications().push(
            NotificationLevel::Error,
            messages.invalid_input_title,
            message.clone(),
        );
        MutationError::new(kind, FailureReason::Invalid, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::RemoteClient;
    use crate::notifications::NotificationCenter;
    use crate::session::SessionPhase;
    use agrisense_cache::{CacheConfig, QueryCache, RetryPolicy};
    use agrisense_core::{HttpMethod, Role};
    use agrisense_test_utils::{
        buyer_registration, farmer_credentials, farmer_identity, farmer_registration,
        MockResponse, MockTransport,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn context(role: Role, transport: MockTransport) -> (SessionContext, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let cache = QueryCache::new(CacheConfig::new().with_retry(RetryPolicy::none()));
        let context = SessionContext::new(
            role,
            cache,
            RemoteClient::new(transport.clone()),
            NotificationCenter::new(Duration::from_secs(5)),
        );
        (context, transport)
    }

    #[tokio::test]
    async fn test_login_seeds_session_without_check() {
        let identity = farmer_identity();
        let (session, transport) = context(
            Role::Farmer,
            MockTransport::new().on(
                HttpMethod::Post,
                "/api/farmer/login",
                MockResponse::json(200, identity.to_value()),
            ),
        );

        let logged_in = session.login(&farmer_credentials()).await.unwrap();
        assert_eq!(logged_in, identity);
        assert_eq!(session.state().phase, SessionPhase::Authenticated);

        session.check().await;
        assert_eq!(transport.call_count(HttpMethod::Get, "/api/farmer/check"), 0);

        let active = session.notifications().active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].level, NotificationLevel::Success);
        assert!(active[0].description.contains(identity.display_name()));
    }

    #[tokio::test]
    async fn test_login_failure_is_generic() {
        let (session, _) = context(
            Role::Farmer,
            MockTransport::new().on(
                HttpMethod::Post,
                "/api/farmer/login",
                MockResponse::text(401, "user farmer1 has password hunter22"),
            ),
        );

        let err = session
            .login(&Credentials::new("farmer1", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.reason, FailureReason::Rejected);
        assert_eq!(err.message, "Invalid username or password");
        assert!(session.identity().is_none());

        let active = session.notifications().active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].description, "Invalid username or password");
        assert!(!active[0].description.contains("hunter22"));
    }

    #[tokio::test]
    async fn test_invalid_input_sends_nothing() {
        let (session, transport) = context(Role::Farmer, MockTransport::new());
        let err = session
            .login(&Credentials::new("", "secret-pass"))
            .await
            .unwrap_err();
        assert_eq!(err.reason, FailureReason::Invalid);
        assert_eq!(transport.total_calls(), 0);
        assert_eq!(session.notifications().active().len(), 1);
    }

    #[tokio::test]
    async fn test_register_seeds_session() {
        let identity = farmer_identity();
        let (session, _) = context(
            Role::Farmer,
            MockTransport::new().on(
                HttpMethod::Post,
                "/api/farmer/register",
                MockResponse::json(201, identity.to_value()),
            ),
        );
        let registered = session.register(&farmer_registration()).await.unwrap();
        assert_eq!(registered, identity);
        assert_eq!(session.identity(), Some(identity));
    }

    #[tokio::test]
    async fn test_register_duplicate_leaves_session() {
        let (session, _) = context(
            Role::Farmer,
            MockTransport::new().on(
                HttpMethod::Post,
                "/api/farmer/register",
                MockResponse::text(409, "duplicate key value violates unique constraint"),
            ),
        );
        let err = session.register(&farmer_registration()).await.unwrap_err();
        assert_eq!(err.reason, FailureReason::Rejected);
        assert!(err.message.contains("may already exist"));
        assert!(session.identity().is_none());
        assert!(!session.notifications().active()[0]
            .description
            .contains("duplicate key"));
    }

    #[tokio::test]
    async fn test_register_role_mismatch_is_invalid() {
        let (session, transport) = context(Role::Farmer, MockTransport::new());
        let err = session.register(&buyer_registration()).await.unwrap_err();
        assert_eq!(err.reason, FailureReason::Invalid);
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_logout_clears_to_null() {
        let identity = farmer_identity();
        let (session, transport) = context(
            Role::Farmer,
            MockTransport::new().on(
                HttpMethod::Post,
                "/api/farmer/logout",
                MockResponse::text(200, "OK"),
            ),
        );
        session.cache().write(session.key(), identity.to_value());

        session.logout().await.unwrap();
        let state = session.state();
        assert_eq!(state.phase, SessionPhase::Unauthenticated);
        assert!(state.identity.is_none());

        // A null entry is settled; no check goes out.
        session.check().await;
        assert_eq!(transport.call_count(HttpMethod::Get, "/api/farmer/check"), 0);
    }

    #[tokio::test]
    async fn test_logout_failure_keeps_identity() {
        let identity = farmer_identity();
        let (session, _) = context(
            Role::Farmer,
            MockTransport::new().on(
                HttpMethod::Post,
                "/api/farmer/logout",
                MockResponse::text(500, "boom"),
            ),
        );
        session.cache().write(session.key(), identity.to_value());

        let err = session.logout().await.unwrap_err();
        assert_eq!(err.reason, FailureReason::Rejected);
        assert_eq!(session.identity(), Some(identity));
    }

    #[test]
    fn test_error_display() {
        let err = MutationError::new(MutationKind::Logout, FailureReason::Rejected, "nope");
        assert_eq!(err.to_string(), "logout failed: nope");
    }
}
