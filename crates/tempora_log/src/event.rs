//! Event types for the entity log.
//!
//! Events are write-once inputs. A log stores them as JSON mappings with five
//! fields (`id`, `entity_id`, `event_type`, `timestamp`, `payload`); [`Event`]
//! is the typed view the timeline and reducer work on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempora_core::{EntityId, EventId, Payload, Timestamp};

/// Field names every event record must carry.
pub const REQUIRED_FIELDS: [&str; 5] = ["id", "entity_id", "event_type", "timestamp", "payload"];

/// Event type - which transition an event requests.
///
/// Values outside the fixed set are kept verbatim in `Unknown` so the reducer
/// can reject them with the offending name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// Starts a lifecycle
    Created,
    /// Shallow-merges the payload into state
    Updated,
    /// Tombstones the entity
    Deleted,
    /// Appends a relationship record
    RelationshipAdded,
    /// Removes matching relationship records
    RelationshipRemoved,
    /// Anything else, kept verbatim
    Unknown(String),
}

impl EventType {
    /// Wire name of this event type
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::RelationshipAdded => "relationship_added",
            Self::RelationshipRemoved => "relationship_removed",
            Self::Unknown(raw) => raw,
        }
    }

    /// Parse a wire name; anything unrecognised becomes `Unknown`
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "created" => Self::Created,
            "updated" => Self::Updated,
            "deleted" => Self::Deleted,
            "relationship_added" => Self::RelationshipAdded,
            "relationship_removed" => Self::RelationshipRemoved,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Relationship events need `relationship_type` and `target_entity` in the payload
    #[must_use]
    pub const fn is_relationship(&self) -> bool {
        matches!(self, Self::RelationshipAdded | Self::RelationshipRemoved)
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        match value {
            EventType::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A TEMPORA event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique within a log; breaks timestamp ties
    pub id: EventId,
    /// Entity the event applies to
    pub entity_id: EntityId,
    /// Requested transition
    pub event_type: EventType,
    /// When the change happened
    pub timestamp: Timestamp,
    /// Type-specific fields
    #[serde(default)]
    pub payload: Payload,
}

/// Why a raw record could not be read as an [`Event`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Record is not a JSON object
    #[error("event record is not an object")]
    NotAnObject,
    /// Required field absent
    #[error("missing required field: {field}")]
    MissingField {
        /// Absent field
        field: &'static str,
    },
    /// Field present with the wrong JSON type
    #[error("field {field} must be {expected}")]
    WrongType {
        /// Mistyped field
        field: &'static str,
        /// Expected JSON type
        expected: &'static str,
    },
}

impl Event {
    /// Event with an empty payload
    pub fn new(
        id: impl Into<EventId>,
        entity_id: impl Into<EntityId>,
        event_type: EventType,
        timestamp: impl Into<Timestamp>,
    ) -> Self {
        Self {
            id: id.into(),
            entity_id: entity_id.into(),
            event_type,
            timestamp: timestamp.into(),
            payload: Payload::new(),
        }
    }

    /// Replace the payload
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Set a single payload field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Read an event from its raw JSON mapping.
    ///
    /// A missing `payload` reads as empty; every other required field must be
    /// a string. The timestamp is taken as-is (conformance is checked by the
    /// validator, not here).
    ///
    /// # Errors
    ///
    /// Returns `RecordError` if a field the reducer needs is absent or mistyped
    pub fn from_record(record: &Value) -> Result<Self, RecordError> {
        let map = record.as_object().ok_or(RecordError::NotAnObject)?;

        let payload = match map.get("payload") {
            None => Payload::new(),
            Some(Value::Object(payload)) => payload.clone(),
            Some(_) => {
                return Err(RecordError::WrongType {
                    field: "payload",
                    expected: "an object",
                })
            }
        };

        Ok(Self {
            id: EventId::new(string_field(map, "id")?),
            entity_id: EntityId::new(string_field(map, "entity_id")?),
            event_type: EventType::parse(string_field(map, "event_type")?),
            timestamp: Timestamp::new(string_field(map, "timestamp")?),
            payload,
        })
    }

    /// Raw JSON mapping for this event
    #[must_use]
    pub fn to_record(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.id.to_string()));
        map.insert("entity_id".to_string(), Value::String(self.entity_id.to_string()));
        map.insert("event_type".to_string(), Value::String(self.event_type.to_string()));
        map.insert("timestamp".to_string(), Value::String(self.timestamp.to_string()));
        map.insert("payload".to_string(), Value::Object(self.payload.clone()));
        Value::Object(map)
    }

    /// Payload field, or `Null` when absent
    #[must_use]
    pub fn payload_value(&self, key: &str) -> &Value {
        self.payload.get(key).unwrap_or(&Value::Null)
    }
}

fn string_field<'a>(map: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, RecordError> {
    match map.get(field) {
        None => Err(RecordError::MissingField { field }),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(RecordError::WrongType {
            field,
            expected: "a string",
        }),
    }
}
