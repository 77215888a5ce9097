//! AgriSense session client library exports.
//!
//! Wiring, leaf to root: [`api_client::RemoteClient`] talks to the server,
//! the shared [`agrisense_cache::QueryCache`] holds what it returned,
//! [`session::SessionContext`] derives the signed-in identity from the
//! cache, its mutations (`login`, `register`, `logout`) seed or clear that
//! entry, and [`gate::AccessGate`] turns the result into a view decision.

pub mod api_client;
pub mod config;
pub mod error;
pub mod gate;
pub mod messages;
pub mod mutations;
pub mod notifications;
pub mod session;
pub mod telemetry;

pub use api_client::{HttpTransport, PathFetcher, RemoteClient, UnauthorizedBehavior};
pub use config::ClientConfig;
pub use error::ClientError;
pub use gate::{Access, AccessGate};
pub use mutations::{FailureReason, MutationError, MutationKind};
pub use notifications::{Notification, NotificationCenter, NotificationLevel};
pub use session::{SessionContext, SessionPhase, SessionState, SessionWatcher};
