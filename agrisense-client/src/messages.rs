//! User-facing copy for session mutations.
//!
//! Failure texts are fixed strings. Server error bodies never reach users.

use agrisense_core::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionMessages {
    pub login_success_title: &'static str,
    pub login_failure_title: &'static str,
    pub login_failure_description: &'static str,
    pub register_success_title: &'static str,
    pub register_failure_title: &'static str,
    pub register_failure_description: &'static str,
    pub logout_success_title: &'static str,
    pub logout_success_description: &'static str,
    pub logout_failure_title: &'static str,
    pub logout_failure_description: &'static str,
    pub invalid_input_title: &'static str,
    pub session_unavailable_title: &'static str,
    pub session_unavailable_description: &'static str,
    welcome_new_prefix: &'static str,
}

const FARMER: SessionMessages = SessionMessages {
    login_success_title: "Login successful",
    login_failure_title: "Login failed",
    login_failure_description: "Invalid username or password",
    register_success_title: "Registration successful",
    register_failure_title: "Registration failed",
    register_failure_description: "Username may already exist. Please try a different one.",
    logout_success_title: "Logged out",
    logout_success_description: "You have been logged out successfully.",
    logout_failure_title: "Logout failed",
    logout_failure_description: "Could not log out. Please try again.",
    invalid_input_title: "Check your details",
    session_unavailable_title: "Session unavailable",
    session_unavailable_description: "We could not reach AgriSense. Please try again shortly.",
    welcome_new_prefix: "Welcome to AgriSense",
};

const BUYER: SessionMessages = SessionMessages {
    login_success_title: "Login successful",
    login_failure_title: "Login failed",
    login_failure_description: "Invalid username or password",
    register_success_title: "Registration successful",
    register_failure_title: "Registration failed",
    register_failure_description:
        "Username may already exist or the business details are incomplete.",
    logout_success_title: "Logged out",
    logout_success_description: "You have been logged out of the marketplace.",
    logout_failure_title: "Logout failed",
    logout_failure_description: "Could not log out. Please try again.",
    invalid_input_title: "Check your details",
    session_unavailable_title: "Session unavailable",
    session_unavailable_description:
        "We could not reach the marketplace. Please try again shortly.",
    welcome_new_prefix: "Welcome to the AgriSense marketplace",
};

pub fn messages_for(role: Role) -> &'static SessionMessages {
    match role {
        Role::Farmer => &FARMER,
        Role::Buyer => &BUYER,
    }
}

impl SessionMessages {
    pub fn welcome_back(&self, name: &str) -> String {
        format!("Welcome back, {}!", name)
    }

    pub fn welcome_new(&self, name: &str) -> String {
        format!("{}, {}!", self.welcome_new_prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failure_text_is_shared() {
        for role in [Role::Farmer, Role::Buyer] {
            assert_eq!(
                messages_for(role).login_failure_description,
                "Invalid username or password"
            );
            assert!(messages_for(role)
                .register_failure_description
                .contains("may already exist"));
        }
    }

    #[test]
    fn test_personalized_greetings() {
        let farmer = messages_for(Role::Farmer);
        assert_eq!(farmer.welcome_back("Ravi"), "Welcome back, Ravi!");
        assert_eq!(farmer.welcome_new("Ravi"), "Welcome to AgriSense, Ravi!");
        let buyer = messages_for(Role::Buyer);
        assert_eq!(
            buyer.welcome_new("Fresh Co"),
            "Welcome to the AgriSense marketplace, Fresh Co!"
        );
    }
}
