//! Session context: the signed-in identity, derived from the shared cache.
//!
//! Nothing here stores the identity itself. The cache entry under the
//! role's check route is the single source of truth, and every state is
//! recomputed from its snapshot.

use crate::api_client::{RemoteClient, UnauthorizedBehavior};
use crate::notifications::NotificationCenter;
use agrisense_cache::{QueryCache, QueryFetcher, QuerySnapshot, QueryStatus};
use agrisense_core::{Identity, QueryKey, RemoteError, Role};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// The first check has not settled.
    Initializing,
    Authenticated,
    /// The server said there is no session (a 401 or a `null` identity).
    Unauthenticated,
    /// The check failed and no identity is known.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub is_loading: bool,
    pub error: Option<RemoteError>,
    pub phase: SessionPhase,
}

impl SessionState {
    pub fn from_snapshot(role: Role, snapshot: &QuerySnapshot) -> Self {
        let (identity, decode_error) = match &snapshot.data {
            None => (None, None),
            Some(value) => match Identity::from_value(role, value) {
                Ok(identity) => (identity, None),
                Err(err) => (None, Some(err)),
            },
        };
        let error = snapshot.error.clone().or(decode_error);

        let phase = if identity.is_some() {
            SessionPhase::Authenticated
        } else if matches!(snapshot.status, QueryStatus::Idle | QueryStatus::Pending) {
            SessionPhase::Initializing
        } else if error.is_some() {
            SessionPhase::Failed
        } else {
            SessionPhase::Unauthenticated
        };

        Self {
            identity,
            is_loading: snapshot.is_loading(),
            error,
            phase,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

/// Shared session handle for one role.
///
/// Cheap to clone; every clone reads the same cache entry.
#[derive(Clone)]
pub struct SessionContext {
    role: Role,
    key: QueryKey,
    cache: QueryCache,
    client: RemoteClient,
    notifications: NotificationCenter,
    check: Arc<dyn QueryFetcher>,
}

impl SessionContext {
    pub fn new(
        role: Role,
        cache: QueryCache,
        client: RemoteClient,
        notifications: NotificationCenter,
    ) -> Self {
        let check = client.fetcher(UnauthorizedBehavior::ReturnNull);
        Self {
            role,
            key: Self::session_key(role),
            cache,
            client,
            notifications,
            check,
        }
    }

    /// The cache key holding a role's identity: its check route.
    pub fn session_key(role: Role) -> QueryKey {
        QueryKey::from_path(role.check_path())
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub(crate) fn client(&self) -> &RemoteClient {
        &self.client
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_snapshot(self.role, &self.cache.peek(&self.key))
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state().identity
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading
    }

    pub fn error(&self) -> Option<RemoteError> {
        self.state().error
    }

    /// Kick off the session check without waiting for it.
    pub fn start(&self) -> SessionState {
        let snapshot = self.cache.read(&self.key, Arc::clone(&self.check));
        SessionState::from_snapshot(self.role, &snapshot)
    }

    /// Resolve the session, joining any check already in flight.
    pub async fn check(&self) -> SessionState {
        if let Err(err) = self.cache.fetch(&self.key, Arc::clone(&self.check)).await {
            tracing::debug!(role = %self.role, error = %err, "Session check failed");
        }
        self.state()
    }

    /// Discard the cached identity's freshness and check again.
    pub async fn refresh(&self) -> SessionState {
        self.cache.invalidate(&self.key);
        self.check().await
    }

    pub fn subscribe(&self) -> SessionWatcher {
        SessionWatcher {
            role: self.role,
            receiver: self.cache.subscribe(&self.key),
        }
    }
}

/// Receives a fresh [`SessionState`] whenever the session entry changes.
pub struct SessionWatcher {
    role: Role,
    receiver: watch::Receiver<QuerySnapshot>,
}

impl SessionWatcher {
    pub fn current(&self) -> SessionState {
        SessionState::from_snapshot(self.role, &self.receiver.borrow())
    }

    /// Wait for the next change. `None` once the cache entry is gone.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.receiver.changed().await.ok()?;
        let snapshot = self.receiver.borrow_and_update().clone();
        Some(SessionState::from_snapshot(self.role, &snapshot))
    }
}
