//! Invocation contexts.
//!
//! A context identifies one partition of a resource: the parent lineage
//! values a child invocation needs for its request parameters, e.g.
//! `{"channel_id": "C024BE91L"}`. Contexts are immutable once built and
//! only ever hold serializable values. Anything transient (such as the
//! full parent record) travels next to the context, never inside it.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Immutable key-value snapshot identifying a resource partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: BTreeMap<String, ContextValue>,
}

/// Wrapper giving JSON values a total order so contexts can be hashed and sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
struct ContextValue(Value);

impl Eq for ContextValue {}

impl std::hash::Hash for ContextValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_string().hash(state);
    }
}

impl PartialOrd for ContextValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ContextValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.to_string().cmp(&other.0.to_string())
    }
}

impl Context {
    /// The empty context used by root invocations.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a copy of this context with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), ContextValue(value.into()));
        self
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).map(|v| &v.0)
    }

    /// Returns the value stored under `key` if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns true for the root (empty) context.
    pub fn is_root(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of keys in the context.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the context holds no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the context entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), &v.0))
    }

    /// Canonical serialization used as the state partition key.
    ///
    /// Keys are emitted in sorted order so equal contexts always produce
    /// the same signature. The root context has signature `{}`.
    pub fn signature(&self) -> String {
        let map: serde_json::Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.0.clone()))
            .collect();
        Value::Object(map).to_string()
    }

    /// Parses a signature produced by [`Context::signature`].
    pub fn from_signature(signature: &str) -> ProtocolResult<Self> {
        match serde_json::from_str::<Value>(signature)? {
            Value::Object(map) => Ok(map
                .into_iter()
                .fold(Self::root(), |ctx, (k, v)| ctx.with(k, v))),
            _ => Err(ProtocolError::InvalidContext(signature.to_string())),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_signature() {
        let ctx = Context::root();
        assert!(ctx.is_root());
        assert_eq!(ctx.signature(), "{}");
    }

    #[test]
    fn signature_is_key_order_independent() {
        let a = Context::root()
            .with("thread_ts", "1700000000.000100")
            .with("channel_id", "C1");
        let b = Context::root()
            .with("channel_id", "C1")
            .with("thread_ts", "1700000000.000100");

        assert_eq!(a, b);
        assert_eq!(
            a.signature(),
            r#"{"channel_id":"C1","thread_ts":"1700000000.000100"}"#
        );
    }

    #[test]
    fn with_does_not_touch_original() {
        let parent = Context::root().with("channel_id", "C1");
        let child = parent.clone().with("thread_ts", "1.0");

        assert_eq!(parent.len(), 1);
        assert_eq!(child.len(), 2);
        assert_eq!(child.get_str("channel_id"), Some("C1"));
    }

    #[test]
    fn signature_parses_back() {
        let ctx = Context::root().with("channel_id", "C1").with("page", 3);
        let parsed = Context::from_signature(&ctx.signature()).unwrap();
        assert_eq!(parsed, ctx);
        assert_eq!(parsed.get("page"), Some(&json!(3)));
    }

    #[test]
    fn non_object_signature_rejected() {
        assert!(matches!(
            Context::from_signature("[1,2]"),
            Err(ProtocolError::InvalidContext(_))
        ));
    }
}
