//! TEMPORA Replay
//!
//! Folds an entity's events into point-in-time snapshots, diffs snapshots,
//! and validates logs. Derivation and validation share one reducer.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
pub mod engine;
pub mod reducer;
pub mod snapshot;
pub mod validate;

pub use diff::{compute_diff, Diff, DiffEndpoint, FieldChange};
pub use engine::{derive_history, derive_snapshot, ReplayConfig, ReplayEngine, ReplayOutcome};
pub use reducer::{apply_event, ApplyError, ApplyErrorKind};
pub use snapshot::{Relationship, Snapshot, DELETED_STATE_FIELD, RELATIONSHIPS_FIELD};
pub use validate::{validate_event, validate_timeline, ValidationError, ValidationRule, Validator};
