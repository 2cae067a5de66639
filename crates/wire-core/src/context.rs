//! Request context and snapshots.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        Self(format!("req_{}", generate_id()))
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generate a short random identifier (URL-safe, 16 characters).
pub fn generate_id() -> String {
    let bytes: [u8; 12] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Reserved memo keys.
pub mod memo_keys {
    /// Accessor of the resolver that produced the component.
    pub const RESOLVER: &str = "resolver";
    /// User-visible alias of the fragment.
    pub const ALIAS: &str = "alias";
    /// Declared fragment name.
    pub const NAME: &str = "name";
    /// Component id.
    pub const ID: &str = "id";
    /// Template handles needed to rebuild the structure.
    pub const HANDLES: &str = "handles";
}

/// Serialized component state handed back by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Server memo persisted during dehydrate.
    #[serde(default)]
    pub memo: Map<String, Value>,
    /// The component's declared data.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Snapshot {
    /// Create a snapshot from a memo and component data.
    pub fn new(memo: Map<String, Value>, data: Map<String, Value>) -> Self {
        Self { memo, data }
    }

    /// Parse a snapshot from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Raw memo value.
    pub fn memo_value(&self, key: &str) -> Option<&Value> {
        self.memo.get(key)
    }

    /// Memo value as a string slice. Non-strings read as absent.
    pub fn memo_str(&self, key: &str) -> Option<&str> {
        self.memo.get(key).and_then(Value::as_str)
    }

    /// The memorized handles, in their original order.
    ///
    /// Non-string entries are skipped.
    pub fn memo_handles(&self) -> Option<Vec<String>> {
        let handles = self.memo.get(memo_keys::HANDLES)?.as_array()?;
        Some(
            handles
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
        )
    }
}

/// A follow-up request for a single component.
#[derive(Debug, Clone)]
pub struct ComponentRequestContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// The snapshot sent by the client.
    pub snapshot: Snapshot,
    /// Property updates sent along with the snapshot.
    pub updates: Map<String, Value>,
}

impl ComponentRequestContext {
    /// Create a new request context for a snapshot.
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            request_id: RequestId::generate(),
            snapshot,
            updates: Map::new(),
        }
    }

    /// Attach property updates.
    pub fn with_updates(mut self, updates: Map<String, Value>) -> Self {
        self.updates = updates;
        self
    }

    /// The snapshot of this request.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_format() {
        let id = RequestId::generate();
        assert!(id.as_str().starts_with("req_"));
        assert_eq!(id.as_str().len(), 20);
        assert_ne!(RequestId::generate(), id);
    }

    #[test]
    fn test_snapshot_from_json() {
        let snapshot = Snapshot::from_json(
            r#"{"memo":{"resolver":"layout","name":"widget.foo","handles":["default",3,"page"]},"data":{"count":1}}"#,
        )
        .unwrap();

        assert_eq!(snapshot.memo_str(memo_keys::RESOLVER), Some("layout"));
        assert_eq!(snapshot.memo_str(memo_keys::ALIAS), None);
        assert_eq!(
            snapshot.memo_handles(),
            Some(vec!["default".to_string(), "page".to_string()])
        );
        assert_eq!(snapshot.data.get("count"), Some(&json!(1)));
    }

    #[test]
    fn test_snapshot_missing_sections_default() {
        let snapshot = Snapshot::from_json("{}").unwrap();
        assert!(snapshot.memo.is_empty());
        assert!(snapshot.data.is_empty());
        assert_eq!(snapshot.memo_handles(), None);
    }

    #[test]
    fn test_memo_str_ignores_non_strings() {
        let mut memo = Map::new();
        memo.insert("name".into(), json!(12));
        let snapshot = Snapshot::new(memo, Map::new());
        assert_eq!(snapshot.memo_str("name"), None);
        assert_eq!(snapshot.memo_value("name"), Some(&json!(12)));
    }
}
