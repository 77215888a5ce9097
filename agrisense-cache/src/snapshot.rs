//! Point-in-time view of a cache entry.

use agrisense_core::{RemoteError, Timestamp};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Nothing cached and nothing requested yet.
    Idle,
    /// A fetch is running and no value has settled yet.
    Pending,
    /// A value (possibly `null`) has settled.
    Resolved,
    /// The last fetch failed. Previously settled data, if any, is retained.
    Errored,
}

/// What a reader sees for a key.
///
/// `data` survives a failed refetch, so an errored snapshot can still carry
/// the last known value.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub data: Option<Value>,
    pub error: Option<RemoteError>,
    pub status: QueryStatus,
    /// Invalidated since it last settled.
    pub is_stale: bool,
    /// A fetch for this key is in flight.
    pub is_fetching: bool,
    pub updated_at: Option<Timestamp>,
}

impl QuerySnapshot {
    pub fn idle() -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Idle,
            is_stale: false,
            is_fetching: false,
            updated_at: None,
        }
    }

    /// Loading means no settled value yet, with a fetch outstanding or about
    /// to be issued.
    pub fn is_loading(&self) -> bool {
        matches!(self.status, QueryStatus::Pending | QueryStatus::Idle)
    }

    pub fn is_resolved(&self) -> bool {
        self.status == QueryStatus::Resolved
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Errored
    }

    /// Decode the cached data. Absent data and JSON `null` both yield `None`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, RemoteError> {
        match &self.data {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| RemoteError::decode(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_idle_counts_as_loading() {
        let snapshot = QuerySnapshot::idle();
        assert!(snapshot.is_loading());
        assert!(!snapshot.is_resolved());
    }

    #[test]
    fn test_decode_null_is_none() {
        let mut snapshot = QuerySnapshot::idle();
        snapshot.status = QueryStatus::Resolved;
        snapshot.data = Some(Value::Null);
        assert_eq!(snapshot.decode::<Vec<i64>>(), Ok(None));
        assert!(!snapshot.is_loading());
    }

    #[test]
    fn test_decode_typed_value() {
        let mut snapshot = QuerySnapshot::idle();
        snapshot.status = QueryStatus::Resolved;
        snapshot.data = Some(json!([1, 2, 3]));
        assert_eq!(snapshot.decode::<Vec<i64>>(), Ok(Some(vec![1, 2, 3])));
        assert!(snapshot.decode::<String>().is_err());
    }
}
