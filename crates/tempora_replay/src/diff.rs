//! Field-level diff between two snapshots.
//!
//! Diffing is shallow: each top-level state field is compared as a whole
//! JSON value, so one relationship added shows up as a single
//! `relationships` change carrying both full lists.

use crate::snapshot::Snapshot;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tempora_core::{State, Timestamp};

/// Name of the synthetic change emitted when the deleted flag differs
pub const DELETED_FIELD: &str = "deleted";

/// One side of a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEndpoint {
    /// `as_of` of the snapshot, `None` for an absent snapshot
    pub as_of: Option<Timestamp>,
}

/// Change to one field.
///
/// `None` means the field is missing on that side, which is distinct from a
/// present JSON `null` (`Some(Value::Null)`). In JSON the former is an absent
/// key, the latter an explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Top-level state field, or `deleted`
    pub field: String,
    /// Value in the earlier snapshot
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub before: Option<Value>,
    /// Value in the later snapshot
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub after: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Differences between two snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    /// Earlier snapshot
    pub before: DiffEndpoint,
    /// Later snapshot
    pub after: DiffEndpoint,
    /// `deleted` first when it changed, then fields in name order
    pub changes: Vec<FieldChange>,
}

impl Diff {
    /// Whether nothing changed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Change record for a field, if it changed
    #[must_use]
    pub fn change(&self, field: &str) -> Option<&FieldChange> {
        self.changes.iter().find(|c| c.field == field)
    }

    /// Names of changed fields, in report order
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.field.as_str()).collect()
    }
}

/// Diff two optional snapshots.
///
/// An absent snapshot compares as empty state with `deleted = false`, but its
/// endpoint reports `as_of: None`.
#[must_use]
pub fn compute_diff(before: Option<&Snapshot>, after: Option<&Snapshot>) -> Diff {
    let empty = State::new();
    let before_state = before.map_or(&empty, |s| &s.state);
    let after_state = after.map_or(&empty, |s| &s.state);
    let before_deleted = before.is_some_and(|s| s.deleted);
    let after_deleted = after.is_some_and(|s| s.deleted);

    let mut changes = Vec::new();

    if before_deleted != after_deleted {
        changes.push(FieldChange {
            field: DELETED_FIELD.to_string(),
            before: Some(Value::Bool(before_deleted)),
            after: Some(Value::Bool(after_deleted)),
        });
    }

    let fields: BTreeSet<&String> = before_state.keys().chain(after_state.keys()).collect();
    for field in fields {
        let old = before_state.get(field);
        let new = after_state.get(field);
        if old != new {
            changes.push(FieldChange {
                field: field.clone(),
                before: old.cloned(),
                after: new.cloned(),
            });
        }
    }

    Diff {
        before: DiffEndpoint {
            as_of: before.map(|s| s.as_of.clone()),
        },
        after: DiffEndpoint {
            as_of: after.map(|s| s.as_of.clone()),
        },
        changes,
    }
}
