//! Splitting a multi-entity log into per-entity logs.
//!
//! Everything downstream operates on one entity at a time.

use crate::event::Event;
use indexmap::IndexMap;
use tempora_core::EntityId;

/// Group events by `entity_id`, keeping first-seen entity order and the
/// relative order of each entity's events.
#[must_use]
pub fn partition_by_entity(events: &[Event]) -> IndexMap<EntityId, Vec<Event>> {
    let mut groups: IndexMap<EntityId, Vec<Event>> = IndexMap::new();
    for event in events {
        groups
            .entry(event.entity_id.clone())
            .or_default()
            .push(event.clone());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    #[test]
    fn test_partition_by_entity() {
        let events = vec![
            Event::new("e1", "company-123", EventType::Created, "2024-01-01"),
            Event::new("e2", "person-456", EventType::Created, "2024-01-02"),
            Event::new("e3", "company-123", EventType::Updated, "2024-01-03"),
        ];
        let groups = partition_by_entity(&events);

        let keys: Vec<_> = groups.keys().map(EntityId::as_str).collect();
        assert_eq!(keys, vec!["company-123", "person-456"]);
        assert_eq!(groups["company-123"].len(), 2);
        assert_eq!(groups["person-456"][0].id.as_str(), "e2");
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition_by_entity(&[]).is_empty());
    }
}
