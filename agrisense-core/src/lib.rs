//! AgriSense Core - Shared Types
//!
//! Pure data structures shared by the query cache and the session client:
//! roles, identities, request payloads, cache keys, the error taxonomy and
//! the transport seam. No I/O happens in this crate.

use chrono::{DateTime, Utc};

pub mod error;
pub mod identity;
pub mod key;
pub mod requests;
pub mod transport;

pub use error::{RemoteError, ValidationError};
pub use identity::{BuyerIdentity, FarmerIdentity, Identity, Role};
pub use key::{KeySegment, QueryKey};
pub use requests::{BuyerRegistration, Credentials, FarmerRegistration, Registration};
pub use transport::{ApiRequest, ApiResponse, HttpMethod, Transport};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;
