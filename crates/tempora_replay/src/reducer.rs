//! The event reducer: one event applied to an optional prior snapshot.
//!
//! `apply_event` is pure. It borrows the prior snapshot, copies whatever it
//! keeps, and returns a fresh snapshot or a typed failure.

use crate::snapshot::{Relationship, Snapshot, DELETED_STATE_FIELD, RELATIONSHIPS_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempora_core::{EntityId, EventId, State};
use tempora_log::{Event, EventType};

/// Why an event could not be applied.
///
/// Every variant names the entity and the failing event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// `created` applied to a live entity
    #[error("cannot create {entity_id}: already exists")]
    EntityAlreadyExists {
        /// Entity the event targeted
        entity_id: EntityId,
        /// The failing event
        event_id: EventId,
    },
    /// Non-`created` event applied before the entity exists
    #[error("cannot apply {event_type} to {entity_id}: does not exist")]
    EntityNotFound {
        /// Entity the event targeted
        entity_id: EntityId,
        /// The failing event
        event_id: EventId,
        /// Requested transition
        event_type: EventType,
    },
    /// Mutating event applied to a deleted entity
    #[error("cannot apply {event_type} to {entity_id}: has been deleted")]
    EntityDeleted {
        /// Entity the event targeted
        entity_id: EntityId,
        /// The failing event
        event_id: EventId,
        /// Requested transition
        event_type: EventType,
    },
    /// `relationship_removed` with no matching `(type, target)` record
    #[error("relationship not found on {entity_id}: {relationship_type} -> {target_entity}")]
    RelationshipNotFound {
        /// Entity the event targeted
        entity_id: EntityId,
        /// The failing event
        event_id: EventId,
        /// Payload `relationship_type`, `null` if absent
        relationship_type: Value,
        /// Payload `target_entity`, `null` if absent
        target_entity: Value,
    },
    /// Event type outside the fixed set
    #[error("unknown event type: {event_type}")]
    UnknownEventType {
        /// Entity the event targeted
        entity_id: EntityId,
        /// The failing event
        event_id: EventId,
        /// Type as written in the event
        event_type: String,
    },
    /// Existing `relationships` field is not a sequence
    #[error("cannot apply {event_type} to {entity_id}: relationships field is not a list")]
    InvalidRelationships {
        /// Entity the event targeted
        entity_id: EntityId,
        /// The failing event
        event_id: EventId,
        /// Requested transition
        event_type: EventType,
    },
}

/// Fieldless discriminant of [`ApplyError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplyErrorKind {
    /// See [`ApplyError::EntityAlreadyExists`]
    EntityAlreadyExists,
    /// See [`ApplyError::EntityNotFound`]
    EntityNotFound,
    /// See [`ApplyError::EntityDeleted`]
    EntityDeleted,
    /// See [`ApplyError::RelationshipNotFound`]
    RelationshipNotFound,
    /// See [`ApplyError::UnknownEventType`]
    UnknownEventType,
    /// See [`ApplyError::InvalidRelationships`]
    InvalidRelationships,
}

impl ApplyError {
    /// Which failure this is
    #[must_use]
    pub const fn kind(&self) -> ApplyErrorKind {
        match self {
            Self::EntityAlreadyExists { .. } => ApplyErrorKind::EntityAlreadyExists,
            Self::EntityNotFound { .. } => ApplyErrorKind::EntityNotFound,
            Self::EntityDeleted { .. } => ApplyErrorKind::EntityDeleted,
            Self::RelationshipNotFound { .. } => ApplyErrorKind::RelationshipNotFound,
            Self::UnknownEventType { .. } => ApplyErrorKind::UnknownEventType,
            Self::InvalidRelationships { .. } => ApplyErrorKind::InvalidRelationships,
        }
    }

    /// Entity the failing event targeted
    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        match self {
            Self::EntityAlreadyExists { entity_id, .. }
            | Self::EntityNotFound { entity_id, .. }
            | Self::EntityDeleted { entity_id, .. }
            | Self::RelationshipNotFound { entity_id, .. }
            | Self::UnknownEventType { entity_id, .. }
            | Self::InvalidRelationships { entity_id, .. } => entity_id,
        }
    }

    /// The failing event
    #[must_use]
    pub fn event_id(&self) -> &EventId {
        match self {
            Self::EntityAlreadyExists { event_id, .. }
            | Self::EntityNotFound { event_id, .. }
            | Self::EntityDeleted { event_id, .. }
            | Self::RelationshipNotFound { event_id, .. }
            | Self::UnknownEventType { event_id, .. }
            | Self::InvalidRelationships { event_id, .. } => event_id,
        }
    }
}

/// Apply one event to the prior snapshot (`None` = entity does not exist yet)
///
/// # Errors
///
/// Returns `ApplyError` when the event's precondition does not hold
pub fn apply_event(prior: Option<&Snapshot>, event: &Event) -> Result<Snapshot, ApplyError> {
    tracing::trace!(event_id = %event.id, event_type = %event.event_type, "applying event");

    match &event.event_type {
        EventType::Created => {
            if prior.is_some_and(|s| !s.deleted) {
                return Err(ApplyError::EntityAlreadyExists {
                    entity_id: event.entity_id.clone(),
                    event_id: event.id.clone(),
                });
            }
            Ok(transition(event, event.payload.clone(), false))
        }
        EventType::Updated => {
            let live = require_live(prior, event)?;
            let mut state = live.state.clone();
            state.extend(event.payload.clone());
            Ok(transition(event, state, false))
        }
        EventType::Deleted => {
            let live = require_live(prior, event)?;
            let mut state = State::new();
            state.insert(DELETED_STATE_FIELD.to_string(), Value::Object(live.state.clone()));
            Ok(transition(event, state, true))
        }
        EventType::RelationshipAdded => {
            let live = require_live(prior, event)?;
            let mut state = live.state.clone();
            let record = Relationship {
                relationship_type: event.payload_value("relationship_type").clone(),
                target: event.payload_value("target_entity").clone(),
                properties: match event.payload.get("properties") {
                    Some(Value::Object(props)) => props.clone(),
                    _ => serde_json::Map::new(),
                },
            }
            .to_record();

            relationships_mut(&mut state, event)?.push(record);
            Ok(transition(event, state, false))
        }
        EventType::RelationshipRemoved => {
            let live = require_live(prior, event)?;
            let mut state = live.state.clone();
            let relationship_type = event.payload_value("relationship_type");
            let target = event.payload_value("target_entity");

            let records = relationships_mut(&mut state, event)?;
            let before = records.len();
            records.retain(|r| !Relationship::record_matches(r, relationship_type, target));

            if records.len() == before {
                return Err(ApplyError::RelationshipNotFound {
                    entity_id: event.entity_id.clone(),
                    event_id: event.id.clone(),
                    relationship_type: relationship_type.clone(),
                    target_entity: target.clone(),
                });
            }
            Ok(transition(event, state, false))
        }
        EventType::Unknown(raw) => Err(ApplyError::UnknownEventType {
            entity_id: event.entity_id.clone(),
            event_id: event.id.clone(),
            event_type: raw.clone(),
        }),
    }
}

/// Prior snapshot, if it exists and is not deleted
fn require_live<'a>(prior: Option<&'a Snapshot>, event: &Event) -> Result<&'a Snapshot, ApplyError> {
    match prior {
        None => Err(ApplyError::EntityNotFound {
            entity_id: event.entity_id.clone(),
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
        }),
        Some(s) if s.deleted => Err(ApplyError::EntityDeleted {
            entity_id: event.entity_id.clone(),
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
        }),
        Some(s) => Ok(s),
    }
}

/// The `relationships` list of a state copy, created empty if absent
fn relationships_mut<'s>(state: &'s mut State, event: &Event) -> Result<&'s mut Vec<Value>, ApplyError> {
    match state
        .entry(RELATIONSHIPS_FIELD)
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(items) => Ok(items),
        _ => Err(ApplyError::InvalidRelationships {
            entity_id: event.entity_id.clone(),
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
        }),
    }
}

fn transition(event: &Event, state: State, deleted: bool) -> Snapshot {
    Snapshot {
        entity_id: event.entity_id.clone(),
        as_of: event.timestamp.clone(),
        state,
        last_event_id: event.id.clone(),
        deleted,
    }
}
