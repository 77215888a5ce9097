//! Request payloads for the session routes.

use crate::error::ValidationError;
use crate::identity::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum password length accepted by the registration form. Login only
/// requires a password to be present.
pub const MIN_PASSWORD_LEN: usize = 6;

fn require_non_blank(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn require_password(password: &str) -> Result<(), ValidationError> {
    require_non_blank("password", password)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::InvalidValue {
            field: "password".to_string(),
            reason: format!("must be at least {} characters", MIN_PASSWORD_LEN),
        });
    }
    Ok(())
}

/// Login payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Presence only. Length rules apply at registration, so a short
    /// wrong password still reaches the server and gets its generic answer.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("username", &self.username)?;
        require_non_blank("password", &self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Farmer sign-up profile.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerRegistration {
    pub username: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub preferred_language: Option<String>,
}

/// Buyer sign-up profile.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerRegistration {
    pub username: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Role-specific registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Registration {
    Farmer(FarmerRegistration),
    Buyer(BuyerRegistration),
}

impl Registration {
    /// Parse a profile document for the given role.
    pub fn from_json(role: Role, json: &str) -> Result<Self, ValidationError> {
        let parsed = match role {
            Role::Farmer => serde_json::from_str(json).map(Registration::Farmer),
            Role::Buyer => serde_json::from_str(json).map(Registration::Buyer),
        };
        parsed.map_err(|e| ValidationError::InvalidValue {
            field: "profile".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn role(&self) -> Role {
        match self {
            Registration::Farmer(_) => Role::Farmer,
            Registration::Buyer(_) => Role::Buyer,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Registration::Farmer(f) => &f.username,
            Registration::Buyer(b) => &b.username,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let (username, password, name) = match self {
            Registration::Farmer(f) => (&f.username, &f.password, &f.name),
            Registration::Buyer(b) => (&b.username, &b.password, &b.name),
        };
        require_non_blank("username", username)?;
        require_password(password)?;
        require_non_blank("name", name)?;
        if let Registration::Farmer(f) = self {
            if let Some(phone) = &f.phone {
                validate_phone(phone)?;
            }
        }
        if let Registration::Buyer(b) = self {
            if let Some(phone) = &b.phone {
                validate_phone(phone)?;
            }
        }
        Ok(())
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-'));
    if !allowed || digits < 10 {
        return Err(ValidationError::InvalidValue {
            field: "phone".to_string(),
            reason: "must contain at least 10 digits".to_string(),
        });
    }
    Ok(())
}

impl fmt::Debug for FarmerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FarmerRegistration")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("phone", &self.phone)
            .field("preferred_language", &self.preferred_language)
            .finish()
    }
}

impl fmt::Debug for BuyerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuyerRegistration")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("business_type", &self.business_type)
            .field("company_name", &self.company_name)
            .field("location", &self.location)
            .field("phone", &self.phone)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn farmer() -> FarmerRegistration {
        FarmerRegistration {
            username: "farmer1".to_string(),
            password: "secret-pass".to_string(),
            name: "Ravi".to_string(),
            location: Some("Nashik".to_string()),
            phone: Some("+91 98000 00000".to_string()),
            preferred_language: Some("mr".to_string()),
        }
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("farmer1", "hunter22");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("farmer1"));
        assert!(!rendered.contains("hunter22"));
    }

    #[test]
    fn test_credentials_validation() {
        assert!(Credentials::new("farmer1", "wrong").validate().is_ok());
        assert!(matches!(
            Credentials::new(" ", "secret-pass").validate(),
            Err(ValidationError::RequiredFieldMissing { .. })
        ));
        assert!(matches!(
            Credentials::new("farmer1", "").validate(),
            Err(ValidationError::RequiredFieldMissing { .. })
        ));
    }

    #[test]
    fn test_registration_requires_name() {
        let mut profile = farmer();
        profile.name = String::new();
        let err = Registration::Farmer(profile).validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::RequiredFieldMissing {
                field: "name".to_string()
            }
        );
    }

    #[test]
    fn test_registration_rejects_short_phone() {
        let mut profile = farmer();
        profile.phone = Some("12345".to_string());
        assert!(Registration::Farmer(profile).validate().is_err());
    }

    #[test]
    fn test_registration_serializes_camel_case() {
        let value = serde_json::to_value(Registration::Farmer(farmer())).unwrap();
        assert_eq!(value["preferredLanguage"], "mr");
        assert_eq!(value["username"], "farmer1");
    }

    #[test]
    fn test_registration_from_json_by_role() {
        let json = r#"{"username":"freshmart","password":"secret-pass","name":"Fresh Mart","businessType":"retailer"}"#;
        let registration = Registration::from_json(Role::Buyer, json).unwrap();
        assert_eq!(registration.role(), Role::Buyer);
        assert_eq!(registration.username(), "freshmart");
        assert!(Registration::from_json(Role::Buyer, "{").is_err());
    }
}
