//! Log validation.
//!
//! Two passes, both collecting rather than stopping: a per-record schema
//! check, and a replay through the same reducer derivation uses. Reducer
//! failures become report entries here instead of propagating.

use crate::engine::{ReplayConfig, ReplayEngine};
use crate::reducer::ApplyError;
use serde_json::Value;
use tempora_core::{Timestamp, TimestampStyle};
use tempora_log::event::REQUIRED_FIELDS;
use tempora_log::{Event, EventType};

/// Label used when a record has no usable `id`
const UNKNOWN_EVENT: &str = "<unknown>";

/// Validation finding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required top-level field absent
    #[error("Event {event}: missing required field: {field}")]
    MissingField {
        /// Event label
        event: String,
        /// Absent field
        field: String,
    },
    /// Field present with the wrong JSON type
    #[error("Event {event}: field {field} must be {expected}")]
    InvalidField {
        /// Event label
        event: String,
        /// Mistyped field
        field: String,
        /// Expected JSON type
        expected: String,
    },
    /// `event_type` outside the fixed set
    #[error("Event {event}: invalid event_type: {event_type}")]
    InvalidEventType {
        /// Event label
        event: String,
        /// Type as written in the record
        event_type: String,
    },
    /// `timestamp` is not a conformant timestamp
    #[error("Event {event}: invalid timestamp format: {timestamp} ({reason})")]
    InvalidTimestamp {
        /// Event label
        event: String,
        /// Timestamp as written
        timestamp: String,
        /// Why it was rejected
        reason: String,
    },
    /// Conformant timestamp whose zone convention differs from the log's
    #[error("Event {event}: timestamp {timestamp} is {found} but the log uses {expected} timestamps")]
    MixedTimestampStyle {
        /// Event label
        event: String,
        /// Timestamp as written
        timestamp: String,
        /// Style of this timestamp
        found: TimestampStyle,
        /// Style of the first conformant timestamp in the log
        expected: TimestampStyle,
    },
    /// Payload lacks a field its event type requires
    #[error("Event {event}: {event_type} payload missing required field: {field}")]
    MissingPayloadField {
        /// Event label
        event: String,
        /// Relationship event type
        event_type: String,
        /// Absent payload field
        field: String,
    },
    /// Replaying the event failed
    #[error("Event {}: {}", .source.event_id(), .source)]
    Replay {
        /// Reducer failure
        #[source]
        source: ApplyError,
    },
}

impl ValidationError {
    /// Label of the event the finding refers to
    #[must_use]
    pub fn event(&self) -> &str {
        match self {
            Self::MissingField { event, .. }
            | Self::InvalidField { event, .. }
            | Self::InvalidEventType { event, .. }
            | Self::InvalidTimestamp { event, .. }
            | Self::MixedTimestampStyle { event, .. }
            | Self::MissingPayloadField { event, .. } => event,
            Self::Replay { source } => source.event_id().as_str(),
        }
    }

    /// Whether this finding came from the replay pass
    #[must_use]
    pub const fn is_replay(&self) -> bool {
        matches!(self, Self::Replay { .. })
    }
}

impl From<ApplyError> for ValidationError {
    fn from(source: ApplyError) -> Self {
        Self::Replay { source }
    }
}

/// Validation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    /// `id`, `entity_id`, `event_type`, `timestamp`, `payload` present and well-typed
    RequiredFields,
    /// `event_type` is one of the five known values
    EventType,
    /// `timestamp` is conformant, and one zone convention holds across the log
    TimestampFormat,
    /// Relationship payloads carry `relationship_type` and `target_entity`
    PayloadFields,
    /// The log replays without reducer failures
    Replay,
}

impl ValidationRule {
    /// Every rule, in report order
    pub const ALL: [ValidationRule; 5] = [
        Self::RequiredFields,
        Self::EventType,
        Self::TimestampFormat,
        Self::PayloadFields,
        Self::Replay,
    ];
}

/// Event log validator
#[derive(Debug, Clone)]
pub struct Validator {
    /// Enabled validation rules
    rules: Vec<ValidationRule>,
}

impl Validator {
    /// Create a new validator with every rule enabled
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: ValidationRule::ALL.to_vec(),
        }
    }

    /// Create a validator with only specific rules
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<ValidationRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Enabled rules
    #[must_use]
    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    fn enabled(&self, rule: ValidationRule) -> bool {
        self.rules.contains(&rule)
    }

    /// Schema findings for one raw event record
    #[must_use]
    pub fn validate_event(&self, record: &Value) -> Vec<ValidationError> {
        let label = record
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_EVENT)
            .to_string();
        self.check_record(record, label)
    }

    /// Schema findings for every record, then replay findings.
    ///
    /// Records missing a field the reducer needs are reported by the schema
    /// pass and left out of the replay.
    #[must_use]
    pub fn validate_timeline(&self, records: &[Value]) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut labels = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let label = match record.get("id").and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => format!("#{}", index),
            };
            errors.extend(self.check_record(record, label.clone()));
            labels.push(label);
        }

        if self.enabled(ValidationRule::TimestampFormat) {
            errors.extend(mixed_styles(records, &labels));
        }

        if self.enabled(ValidationRule::Replay) {
            let events: Vec<Event> = records
                .iter()
                .filter_map(|r| Event::from_record(r).ok())
                .collect();
            errors.extend(self.replay_errors(&events));
        }

        tracing::debug!(
            records = records.len(),
            errors = errors.len(),
            "validated timeline"
        );
        errors
    }

    fn replay_errors(&self, events: &[Event]) -> Vec<ValidationError> {
        match ReplayEngine::new()
            .with_config(ReplayConfig::collecting())
            .replay(events, None)
        {
            Ok(outcome) => outcome.errors.into_iter().map(ValidationError::from).collect(),
            // Collecting replays never stop early
            Err(err) => vec![err.into()],
        }
    }

    fn check_record(&self, record: &Value, event: String) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let Some(map) = record.as_object() else {
            if self.enabled(ValidationRule::RequiredFields) {
                errors.push(ValidationError::InvalidField {
                    event,
                    field: "event".to_string(),
                    expected: "an object".to_string(),
                });
            }
            return errors;
        };

        if self.enabled(ValidationRule::RequiredFields) {
            for field in REQUIRED_FIELDS {
                match (field, map.get(field)) {
                    (_, None) => errors.push(ValidationError::MissingField {
                        event: event.clone(),
                        field: field.to_string(),
                    }),
                    ("payload", Some(v)) if !v.is_object() => {
                        errors.push(ValidationError::InvalidField {
                            event: event.clone(),
                            field: field.to_string(),
                            expected: "an object".to_string(),
                        });
                    }
                    ("payload", Some(_)) => {}
                    (_, Some(v)) if !v.is_string() => {
                        errors.push(ValidationError::InvalidField {
                            event: event.clone(),
                            field: field.to_string(),
                            expected: "a string".to_string(),
                        });
                    }
                    _ => {}
                }
            }
        }

        let event_type = map.get("event_type").and_then(Value::as_str).map(EventType::parse);

        if self.enabled(ValidationRule::EventType) {
            if let Some(EventType::Unknown(raw)) = &event_type {
                errors.push(ValidationError::InvalidEventType {
                    event: event.clone(),
                    event_type: raw.clone(),
                });
            }
        }

        if self.enabled(ValidationRule::TimestampFormat) {
            if let Some(raw) = map.get("timestamp").and_then(Value::as_str) {
                if let Err(err) = Timestamp::new(raw).check() {
                    errors.push(ValidationError::InvalidTimestamp {
                        event: event.clone(),
                        timestamp: raw.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if self.enabled(ValidationRule::PayloadFields) {
            if let (Some(kind), Some(Value::Object(payload))) = (&event_type, map.get("payload")) {
                if kind.is_relationship() {
                    for field in ["relationship_type", "target_entity"] {
                        if !payload.contains_key(field) {
                            errors.push(ValidationError::MissingPayloadField {
                                event: event.clone(),
                                event_type: kind.to_string(),
                                field: field.to_string(),
                            });
                        }
                    }
                }
            }
        }

        errors
    }
}

/// Records whose conformant timestamp differs in style from the first one
fn mixed_styles(records: &[Value], labels: &[String]) -> Vec<ValidationError> {
    let stamps = records.iter().zip(labels).filter_map(|(record, label)| {
        let ts = Timestamp::new(record.get("timestamp")?.as_str()?);
        ts.check().ok().map(|()| (label, ts))
    });

    let mut expected = None;
    let mut errors = Vec::new();
    for (label, ts) in stamps {
        let found = ts.style();
        match expected {
            None => expected = Some(found),
            Some(style) if style != found => errors.push(ValidationError::MixedTimestampStyle {
                event: label.clone(),
                timestamp: ts.to_string(),
                found,
                expected: style,
            }),
            Some(_) => {}
        }
    }
    errors
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Schema findings for one raw event record, all rules enabled
#[must_use]
pub fn validate_event(record: &Value) -> Vec<ValidationError> {
    Validator::new().validate_event(record)
}

/// Schema and replay findings for a raw log, all rules enabled
#[must_use]
pub fn validate_timeline(records: &[Value]) -> Vec<ValidationError> {
    Validator::new().validate_timeline(records)
}
