//! Deterministic ordering of an entity's events.
//!
//! The timeline key is `(timestamp, id)`, both compared as strings. With ids
//! unique inside a log the key is unique, so the order is total and no sort
//! stability is needed.

use crate::event::Event;
use std::borrow::Borrow;
use std::cmp::Ordering;
use tempora_core::Timestamp;

/// Compare two events by timeline key
#[must_use]
pub fn timeline_order(a: &Event, b: &Event) -> Ordering {
    a.timestamp
        .cmp(&b.timestamp)
        .then_with(|| a.id.cmp(&b.id))
}

/// Order events by `(timestamp, id)` without touching the input
#[must_use]
pub fn build_timeline(events: &[Event]) -> Vec<Event> {
    Timeline::build(events).into_events()
}

/// Borrowing variant of [`build_timeline`]
#[must_use]
pub fn order_refs(events: &[Event]) -> Vec<&Event> {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_unstable_by(|a, b| timeline_order(a, b));
    ordered
}

/// Length of the prefix of `ordered` with `timestamp <= as_of`.
///
/// This is a prefix, not a filter: it ends at the first later event even if
/// an earlier-stamped one follows in a mis-sorted input.
#[must_use]
pub fn prefix_len<E: Borrow<Event>>(ordered: &[E], as_of: &Timestamp) -> usize {
    ordered
        .iter()
        .position(|e| e.borrow().timestamp > *as_of)
        .unwrap_or(ordered.len())
}

/// An ordered, owned sequence of events
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Timeline {
    events: Vec<Event>,
}

impl Timeline {
    /// Build a timeline from events in any order
    #[must_use]
    pub fn build(events: &[Event]) -> Self {
        let mut events = events.to_vec();
        events.sort_unstable_by(timeline_order);
        tracing::trace!(events = events.len(), "built timeline");
        Self { events }
    }

    /// Events in timeline order
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Consume and return the ordered events
    #[must_use]
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Number of events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the timeline has no events
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The prefix of events with `timestamp <= as_of`
    #[must_use]
    pub fn up_to(&self, as_of: &Timestamp) -> &[Event] {
        &self.events[..prefix_len(&self.events, as_of)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use proptest::prelude::*;

    fn ev(id: &str, ts: &str) -> Event {
        Event::new(id, "company-123", EventType::Updated, ts)
    }

    #[test]
    fn test_build_timeline_sorts_by_timestamp() {
        let events = vec![
            ev("evt-003", "2024-03-20T14:00:00Z"),
            ev("evt-001", "2024-01-01T00:00:00Z"),
            ev("evt-002", "2024-03-15T10:30:00Z"),
        ];
        let ordered = build_timeline(&events);
        let ids: Vec<_> = ordered.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["evt-001", "evt-002", "evt-003"]);
        // Input untouched
        assert_eq!(events[0].id.as_str(), "evt-003");
    }

    #[test]
    fn test_build_timeline_tie_break_by_id() {
        let events = vec![
            ev("b", "2024-01-01T00:00:00Z"),
            ev("a", "2024-01-01T00:00:00Z"),
            ev("c", "2023-12-31T00:00:00Z"),
        ];
        let ordered = build_timeline(&events);
        let ids: Vec<_> = ordered.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_build_timeline_empty() {
        assert!(build_timeline(&[]).is_empty());
        assert!(Timeline::build(&[]).is_empty());
    }

    #[test]
    fn test_up_to_is_prefix() {
        let timeline = Timeline::build(&[
            ev("evt-001", "2024-01-01T00:00:00Z"),
            ev("evt-002", "2024-03-15T10:30:00Z"),
            ev("evt-003", "2024-06-01T09:00:00Z"),
        ]);
        assert_eq!(timeline.up_to(&Timestamp::new("2024-03-15T10:30:00Z")).len(), 2);
        assert_eq!(timeline.up_to(&Timestamp::new("2023-01-01T00:00:00Z")).len(), 0);
        assert_eq!(timeline.up_to(&Timestamp::new("2099-01-01T00:00:00Z")).len(), 3);
    }

    #[test]
    fn test_prefix_len_halts_at_first_later_event() {
        // Not a timeline order; the cut must still stop at "evt-002".
        let events = vec![
            ev("evt-001", "2024-01-01T00:00:00Z"),
            ev("evt-002", "2024-05-01T00:00:00Z"),
            ev("evt-003", "2024-02-01T00:00:00Z"),
        ];
        assert_eq!(prefix_len(&events, &Timestamp::new("2024-03-01T00:00:00Z")), 1);

        let refs: Vec<&Event> = events.iter().collect();
        assert_eq!(prefix_len(&refs, &Timestamp::new("2024-12-01T00:00:00Z")), 3);
        assert_eq!(prefix_len::<Event>(&[], &Timestamp::new("2024-12-01T00:00:00Z")), 0);
    }

    #[test]
    fn test_order_refs_matches_build() {
        let events = vec![ev("2", "2024-02-02"), ev("1", "2024-02-02"), ev("0", "2024-02-03")];
        let refs: Vec<_> = order_refs(&events).into_iter().cloned().collect();
        assert_eq!(refs, build_timeline(&events));
    }

    proptest! {
        #[test]
        fn prop_timeline_is_total_order(
            entries in proptest::collection::btree_map("[a-z]{1,6}", 0u8..5, 0..20)
        ) {
            let events: Vec<Event> = entries
                .iter()
                .map(|(id, day)| ev(id, &format!("2024-01-0{}", day + 1)))
                .collect();
            let ordered = build_timeline(&events);
            prop_assert_eq!(ordered.len(), events.len());
            for pair in ordered.windows(2) {
                prop_assert_eq!(timeline_order(&pair[0], &pair[1]), Ordering::Less);
            }

            let mut reversed = events.clone();
            reversed.reverse();
            prop_assert_eq!(build_timeline(&reversed), ordered);
        }
    }
}
