//! Fetchers resolve a key into a value on cache miss.

use agrisense_core::{QueryKey, RemoteError};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

/// Retrieves the value for a key from wherever it lives.
///
/// This trait abstracts over the remote data client, allowing the cache to
/// be exercised without a network.
///
/// A fetcher returning `Ok(Value::Null)` declares the resource "known to be
/// absent", which is a resolved state rather than an error.
#[async_trait]
pub trait QueryFetcher: Send + Sync {
    async fn fetch(&self, key: &QueryKey) -> Result<Value, RemoteError>;
}

/// Adapts a closure into a [`QueryFetcher`].
pub struct FnFetcher<F> {
    f: F,
}

impl<F> FnFetcher<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> QueryFetcher for FnFetcher<F>
where
    F: Fn(QueryKey) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, RemoteError>> + Send,
{
    async fn fetch(&self, key: &QueryKey) -> Result<Value, RemoteError> {
        (self.f)(key.clone()).await
    }
}
