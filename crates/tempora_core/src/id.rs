//! Identifiers for TEMPORA events and entities.
//!
//! Identifiers are opaque strings supplied by whoever writes the log.
//! They order lexicographically, which is what the timeline tie-break relies on.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Event identifier - unique within one log, used as the ordering tie-break
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Create from any string-like value
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for EventId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Entity identifier - names the subject an event mutates
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create from any string-like value
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        let event_id = EventId::new("evt-001");
        let entity_id = EntityId::from("company-123");

        assert_eq!(event_id.as_str(), "evt-001");
        assert_eq!(entity_id.as_str(), "company-123");
    }

    #[test]
    fn test_id_display() {
        let id = EventId::new("evt-042");
        assert_eq!(format!("{}", id), "evt-042");
    }

    #[test]
    fn test_id_ord_is_lexicographic() {
        let a = EventId::new("evt-10");
        let b = EventId::new("evt-9");
        // String order, not numeric order
        assert!(a < b);
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = EntityId::new("person-456");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"person-456\"");

        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
