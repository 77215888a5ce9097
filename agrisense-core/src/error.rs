//! Error types for AgriSense operations

use thiserror::Error;

/// Failures of a single remote round trip.
///
/// `Clone` so one in-flight fetch can hand the same error to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Transport failure: {reason}")]
    Transport { reason: String },

    #[error("{status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {reason}")]
    Decode { reason: String },
}

impl RemoteError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// HTTP status code, if the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }

    /// Whether repeating the same request could plausibly succeed.
    ///
    /// Transport failures, request timeouts, throttling and server errors
    /// qualify. Other client errors and malformed bodies do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            Self::Decode { .. } => false,
        }
    }
}

/// Validation errors for locally built payloads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = RemoteError::status(409, "Username already exists");
        assert_eq!(err.to_string(), "409: Username already exists");
        assert_eq!(err.status_code(), Some(409));
    }

    #[test]
    fn test_unauthorized_detection() {
        assert!(RemoteError::status(401, "Unauthorized").is_unauthorized());
        assert!(!RemoteError::status(403, "Forbidden").is_unauthorized());
        assert!(!RemoteError::transport("connection refused").is_unauthorized());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(RemoteError::transport("reset").is_retryable());
        assert!(RemoteError::status(503, "").is_retryable());
        assert!(RemoteError::status(429, "").is_retryable());
        assert!(RemoteError::status(408, "").is_retryable());
        assert!(!RemoteError::status(400, "").is_retryable());
        assert!(!RemoteError::status(401, "").is_retryable());
        assert!(!RemoteError::decode("eof").is_retryable());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::RequiredFieldMissing {
            field: "username".to_string(),
        };
        assert_eq!(err.to_string(), "Required field missing: username");
    }
}
