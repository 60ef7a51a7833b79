//! Point-in-time entity snapshots.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempora_core::{CoreResult, EntityId, EventId, State, StateDigest, Timestamp};

/// Reserved state field holding the relationship records
pub const RELATIONSHIPS_FIELD: &str = "relationships";

/// Marker field a deletion leaves behind, holding the pre-deletion state
pub const DELETED_STATE_FIELD: &str = "_deleted_state";

/// Entity state as of a point in time.
///
/// Snapshots are values: every transition builds a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Entity this snapshot describes
    pub entity_id: EntityId,
    /// Time the snapshot is valid for
    pub as_of: Timestamp,
    /// Current attributes
    pub state: State,
    /// Most recently applied event
    pub last_event_id: EventId,
    /// Whether the entity is deleted
    pub deleted: bool,
}

impl Snapshot {
    /// Get a top-level state field
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.state.get(field)
    }

    /// Relationship records, in insertion order.
    ///
    /// Entries that are not JSON objects are skipped.
    #[must_use]
    pub fn relationships(&self) -> Vec<Relationship> {
        match self.state.get(RELATIONSHIPS_FIELD) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(Relationship::from_record)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// State captured by the deletion tombstone, if this snapshot is deleted
    #[must_use]
    pub fn tombstone(&self) -> Option<&Map<String, Value>> {
        if !self.deleted {
            return None;
        }
        self.state.get(DELETED_STATE_FIELD).and_then(Value::as_object)
    }

    /// Content digest of the state
    ///
    /// # Errors
    ///
    /// Returns `CoreError` if the state cannot be encoded
    pub fn digest(&self) -> CoreResult<StateDigest> {
        StateDigest::of(&self.state)
    }

    /// Copy of this snapshot re-stamped with another `as_of`
    #[must_use]
    pub fn at(mut self, as_of: Timestamp) -> Self {
        self.as_of = as_of;
        self
    }
}

/// Typed view of one relationship record `{type, target, ...properties}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship type (`null` when the event omitted it)
    pub relationship_type: Value,
    /// Target entity (`null` when the event omitted it)
    pub target: Value,
    /// Every other key on the record
    pub properties: Map<String, Value>,
}

impl Relationship {
    /// Build from the record's fields; missing `type`/`target` read as `null`
    #[must_use]
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let mut properties = record.clone();
        let relationship_type = properties.remove("type").unwrap_or(Value::Null);
        let target = properties.remove("target").unwrap_or(Value::Null);
        Self {
            relationship_type,
            target,
            properties,
        }
    }

    /// Encode as a state record. Properties are merged over `type` and
    /// `target`, so a property with either name wins.
    #[must_use]
    pub fn to_record(&self) -> Value {
        let mut record = Map::new();
        record.insert("type".to_string(), self.relationship_type.clone());
        record.insert("target".to_string(), self.target.clone());
        record.extend(self.properties.clone());
        Value::Object(record)
    }

    /// Whether a state record has this `(type, target)` pair.
    ///
    /// Missing keys compare as `null`; non-object records never match.
    #[must_use]
    pub fn record_matches(record: &Value, relationship_type: &Value, target: &Value) -> bool {
        record.as_object().is_some_and(|r| {
            r.get("type").unwrap_or(&Value::Null) == relationship_type
                && r.get("target").unwrap_or(&Value::Null) == target
        })
    }
}
