//! Identity types for authenticated farmers and buyers

use crate::error::{RemoteError, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ROLE
// ============================================================================

/// Which half of the application a session belongs to.
///
/// Farmers and buyers use parallel but separate route families, so every
/// session-related path is derived from the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Buyer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Buyer => "buyer",
        }
    }

    /// Server route family, e.g. `/api/farmer`.
    pub fn api_prefix(&self) -> String {
        format!("/api/{}", self.as_str())
    }

    pub fn check_path(&self) -> String {
        format!("{}/check", self.api_prefix())
    }

    pub fn login_path(&self) -> String {
        format!("{}/login", self.api_prefix())
    }

    pub fn register_path(&self) -> String {
        format!("{}/register", self.api_prefix())
    }

    pub fn logout_path(&self) -> String {
        format!("{}/logout", self.api_prefix())
    }

    /// Front-end route unauthenticated visitors are sent to.
    pub fn login_route(&self) -> String {
        format!("/{}/login", self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "farmer" => Ok(Role::Farmer),
            "buyer" => Ok(Role::Buyer),
            other => Err(ValidationError::InvalidValue {
                field: "role".to_string(),
                reason: format!("unknown role '{}', expected 'farmer' or 'buyer'", other),
            }),
        }
    }
}

// ============================================================================
// IDENTITY RECORDS
// ============================================================================

/// Profile of an authenticated farmer as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerIdentity {
    pub id: i64,
    pub username: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
}

/// Profile of an authenticated buyer as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerIdentity {
    pub id: i64,
    pub username: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// The authenticated user's profile, role-specific.
///
/// Serializes as the bare server record. Deserialization is role-directed
/// through [`Identity::from_value`] because the two records overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Identity {
    Farmer(FarmerIdentity),
    Buyer(BuyerIdentity),
}

impl Identity {
    /// Decode a server record for the given role.
    ///
    /// JSON `null` means "known to be absent" and decodes to `None`.
    pub fn from_value(role: Role, value: &Value) -> Result<Option<Self>, RemoteError> {
        if value.is_null() {
            return Ok(None);
        }
        let identity = match role {
            Role::Farmer => serde_json::from_value::<FarmerIdentity>(value.clone())
                .map(Identity::Farmer),
            Role::Buyer => {
                serde_json::from_value::<BuyerIdentity>(value.clone()).map(Identity::Buyer)
            }
        };
        identity
            .map(Some)
            .map_err(|e| RemoteError::decode(format!("{} identity: {}", role, e)))
    }

    /// Like [`Identity::from_value`], but absence is an error.
    ///
    /// Login and registration must answer with a record.
    pub fn require(role: Role, value: &Value) -> Result<Self, RemoteError> {
        Self::from_value(role, value)?
            .ok_or_else(|| RemoteError::decode(format!("{} identity: empty response", role)))
    }

    pub fn to_value(&self) -> Value {
        // Plain structs of strings and integers always serialize.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::Farmer(_) => Role::Farmer,
            Identity::Buyer(_) => Role::Buyer,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Identity::Farmer(f) => f.id,
            Identity::Buyer(b) => b.id,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Identity::Farmer(f) => &f.username,
            Identity::Buyer(b) => &b.username,
        }
    }

    /// Name shown in greetings; falls back to the username.
    pub fn display_name(&self) -> &str {
        let name = match self {
            Identity::Farmer(f) => &f.name,
            Identity::Buyer(b) => &b.name,
        };
        if name.trim().is_empty() {
            self.username()
        } else {
            name
        }
    }
}
