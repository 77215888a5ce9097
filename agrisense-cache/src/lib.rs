//! AgriSense Query Cache
//!
//! A process-wide, injectable cache keyed by [`QueryKey`]. It makes three
//! promises:
//!
//! - **De-duplication**: concurrent reads of a key collapse into one
//!   underlying fetch whose result is broadcast to every waiter.
//! - **Direct writes**: a known result can be seeded without a fetch, and
//!   subscribers see it immediately.
//! - **Ordered settlement**: every change is stamped with a [`Generation`].
//!   A fetch that started before a later write cannot overwrite it, and a
//!   mutation's write loses to any mutation issued after it.
//!
//! # Example
//!
//! ```ignore
//! let cache = QueryCache::with_defaults();
//! let key = QueryKey::from_path("/api/farmer/check");
//!
//! // Joins any fetch already in flight for the key.
//! let value = cache.fetch(&key, fetcher.clone()).await?;
//!
//! // Seed after a successful login; no re-fetch happens.
//! cache.write(&key, identity.to_value());
//! ```
//!
//! [`QueryKey`]: agrisense_core::QueryKey

pub mod fetcher;
pub mod generation;
pub mod retry;
pub mod snapshot;
pub mod stats;
pub mod store;

pub use fetcher::{FnFetcher, QueryFetcher};
pub use generation::Generation;
pub use retry::RetryPolicy;
pub use snapshot::{QuerySnapshot, QueryStatus};
pub use stats::CacheStats;
pub use store::{CacheConfig, QueryCache};
