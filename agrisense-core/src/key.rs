//! Cache keys: ordered tuples identifying a logical resource.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One segment of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySegment {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Bool(b) => write!(f, "{}", b),
            KeySegment::Int(i) => write!(f, "{}", i),
            KeySegment::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for KeySegment {
    fn from(value: &str) -> Self {
        KeySegment::Str(value.to_string())
    }
}

impl From<String> for KeySegment {
    fn from(value: String) -> Self {
        KeySegment::Str(value)
    }
}

impl From<i64> for KeySegment {
    fn from(value: i64) -> Self {
        KeySegment::Int(value)
    }
}

impl From<bool> for KeySegment {
    fn from(value: bool) -> Self {
        KeySegment::Bool(value)
    }
}

/// Ordered sequence of segments indexing the query cache.
///
/// The first segment is conventionally the resource path, so
/// `["/api/fields", 3]` addresses `/api/fields/3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    pub fn new(segments: Vec<KeySegment>) -> Self {
        Self(segments)
    }

    /// Single-segment key for a resource path.
    pub fn from_path(path: impl Into<String>) -> Self {
        Self(vec![KeySegment::Str(path.into())])
    }

    /// Append a segment, builder style.
    pub fn with(mut self, segment: impl Into<KeySegment>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Request path addressed by this key: segments joined with `/`.
    pub fn path(&self) -> String {
        self.0
            .iter()
            .map(|segment| segment.to_string())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Whether `prefix` matches the leading segments of this key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(|segment| match segment {
                KeySegment::Str(s) => format!("{:?}", s),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{}]", rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_path_joins_segments() {
        let key = QueryKey::from_path("/api/fields").with(3i64);
        assert_eq!(key.path(), "/api/fields/3");
        assert_eq!(key.to_string(), "[\"/api/fields\", 3]");
    }

    #[test]
    fn test_prefix_matching() {
        let prefix = QueryKey::from_path("/api/fields");
        assert!(QueryKey::from_path("/api/fields").with(1i64).starts_with(&prefix));
        assert!(!QueryKey::from_path("/api/farmer/check").starts_with(&prefix));
    }

    #[test]
    fn test_key_serializes_as_plain_array() {
        let key = QueryKey::from_path("/api/market").with("tomato").with(true);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "[\"/api/market\",\"tomato\",true]");
    }

    proptest! {
        #[test]
        fn key_is_prefix_of_its_extensions(path in "/[a-z]{1,8}(/[a-z]{1,8}){0,3}", id in any::<i64>()) {
            let base = QueryKey::from_path(path);
            let extended = base.clone().with(id);
            prop_assert!(extended.starts_with(&base));
            prop_assert!(!base.starts_with(&extended));
        }
    }
}
