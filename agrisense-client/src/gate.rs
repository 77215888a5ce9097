//! Access decisions for role-protected views.

use crate::messages::messages_for;
use crate::session::{SessionPhase, SessionState};
use agrisense_core::{Identity, Role};

#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    /// Session still resolving; show a loading state.
    Checking,
    Granted(Identity),
    /// The check failed and nothing is known about the user. Only the
    /// status code is kept; the server's body stays in the logs.
    Unavailable { status: Option<u16> },
    Denied { redirect_to: String },
}

impl Access {
    /// One line for the user, built from fixed per-role copy.
    pub fn describe(&self, role: Role) -> String {
        match self {
            Access::Checking => "Checking your session...".to_string(),
            Access::Granted(identity) => format!("Signed in as {}", identity.display_name()),
            Access::Unavailable { status: Some(status) } => format!(
                "{} (HTTP {})",
                messages_for(role).session_unavailable_description,
                status
            ),
            Access::Unavailable { status: None } => {
                messages_for(role).session_unavailable_description.to_string()
            }
            Access::Denied { redirect_to } => {
                format!("Not signed in. Log in at {}", redirect_to)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessGate {
    role: Role,
}

impl AccessGate {
    pub fn for_role(role: Role) -> Self {
        Self { role }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn evaluate(&self, state: &SessionState) -> Access {
        if let Some(identity) = &state.identity {
            if identity.role() == self.role {
                return Access::Granted(identity.clone());
            }
            return self.deny();
        }
        match (state.phase, &state.error) {
            (SessionPhase::Initializing, _) => Access::Checking,
            (SessionPhase::Failed, Some(err)) => {
                tracing::debug!(role = %self.role, error = %err, "Session check unavailable");
                Access::Unavailable {
                    status: err.status_code(),
                }
            }
            _ => self.deny(),
        }
    }

    fn deny(&self) -> Access {
        Access::Denied {
            redirect_to: self.role.login_route(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrisense_core::RemoteError;
    use agrisense_test_utils::{buyer_identity, farmer_identity};

    fn state(identity: Option<Identity>, error: Option<RemoteError>, phase: SessionPhase) -> SessionState {
        SessionState {
            identity,
            is_loading: phase == SessionPhase::Initializing,
            error,
            phase,
        }
    }

    #[test]
    fn test_initializing_is_checking() {
        let gate = AccessGate::for_role(Role::Farmer);
        assert_eq!(
            gate.evaluate(&state(None, None, SessionPhase::Initializing)),
            Access::Checking
        );
    }

    #[test]
    fn test_identity_grants_even_with_error() {
        let gate = AccessGate::for_role(Role::Farmer);
        let identity = farmer_identity();
        let access = gate.evaluate(&state(
            Some(identity.clone()),
            Some(RemoteError::transport("offline")),
            SessionPhase::Authenticated,
        ));
        assert_eq!(access, Access::Granted(identity));
    }

    #[test]
    fn test_unauthenticated_redirects_to_role_login() {
        let access = AccessGate::for_role(Role::Buyer)
            .evaluate(&state(None, None, SessionPhase::Unauthenticated));
        assert_eq!(
            access,
            Access::Denied {
                redirect_to: "/buyer/login".to_string()
            }
        );
    }

    #[test]
    fn test_failed_check_is_unavailable() {
        let err = RemoteError::status(503, "down");
        let access = AccessGate::for_role(Role::Farmer)
            .evaluate(&state(None, Some(err), SessionPhase::Failed));
        assert_eq!(access, Access::Unavailable { status: Some(503) });
    }

    #[test]
    fn test_unavailable_description_hides_server_body() {
        for role in [Role::Farmer, Role::Buyer] {
            let err = RemoteError::status(500, "pg error: relation farmers password_hash");
            let access =
                AccessGate::for_role(role).evaluate(&state(None, Some(err), SessionPhase::Failed));
            let text = access.describe(role);
            assert!(!text.contains("pg error"));
            assert!(!text.contains("password_hash"));
            assert!(text.starts_with(messages_for(role).session_unavailable_description));
            assert!(text.ends_with("(HTTP 500)"));
        }
    }

    #[test]
    fn test_transport_failure_description_is_fixed_copy() {
        let err = RemoteError::transport("dns error: agrisense.internal not found");
        let access = AccessGate::for_role(Role::Buyer)
            .evaluate(&state(None, Some(err), SessionPhase::Failed));
        assert_eq!(access, Access::Unavailable { status: None });
        assert_eq!(
            access.describe(Role::Buyer),
            messages_for(Role::Buyer).session_unavailable_description
        );
    }

    #[test]
    fn test_other_role_is_denied() {
        let access = AccessGate::for_role(Role::Farmer).evaluate(&state(
            Some(buyer_identity()),
            None,
            SessionPhase::Authenticated,
        ));
        assert_eq!(
            access,
            Access::Denied {
                redirect_to: "/farmer/login".to_string()
            }
        );
    }
}
