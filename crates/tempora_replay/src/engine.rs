//! Replay engine: folds a timeline through the reducer.
//!
//! Snapshot derivation and timeline validation both run through
//! [`ReplayEngine`], so they cannot disagree about what an event does.

use crate::reducer::{apply_event, ApplyError};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use tempora_core::Timestamp;
use tempora_log::timeline::{order_refs, prefix_len};
use tempora_log::Event;

/// Replay engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Stop on first error
    pub stop_on_error: bool,
    /// Maximum events to replay (0 = unlimited)
    pub max_events: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            stop_on_error: true,
            max_events: 0,
        }
    }
}

impl ReplayConfig {
    /// Keep replaying past failures, collecting them
    #[must_use]
    pub fn collecting() -> Self {
        Self {
            stop_on_error: false,
            ..Self::default()
        }
    }
}

/// Result of a replay
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplayOutcome {
    /// Snapshot after the last successfully applied event
    pub snapshot: Option<Snapshot>,
    /// Number of events applied without error
    pub applied: usize,
    /// Failures captured when not stopping on error, in timeline order
    pub errors: Vec<ApplyError>,
}

/// Replay engine for folding events into snapshots
#[derive(Debug, Clone, Default)]
pub struct ReplayEngine {
    config: ReplayConfig,
}

impl ReplayEngine {
    /// Create a new replay engine
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ReplayConfig::default(),
        }
    }

    /// Create with custom config
    #[must_use]
    pub fn with_config(mut self, config: ReplayConfig) -> Self {
        self.config = config;
        self
    }

    /// Replay events (any order) from an absent snapshot.
    ///
    /// With `as_of`, only the timeline prefix with `timestamp <= as_of` is
    /// folded. A failing event leaves the running snapshot unchanged; it is
    /// either returned (`stop_on_error`) or collected into the outcome.
    ///
    /// # Errors
    ///
    /// Returns the first `ApplyError` when `stop_on_error` is set
    pub fn replay(
        &self,
        events: &[Event],
        as_of: Option<&Timestamp>,
    ) -> Result<ReplayOutcome, ApplyError> {
        self.replay_with_callback(events, as_of, |_, _| {})
    }

    /// Replay with a callback after every successfully applied event
    ///
    /// # Errors
    ///
    /// Returns the first `ApplyError` when `stop_on_error` is set
    pub fn replay_with_callback<F>(
        &self,
        events: &[Event],
        as_of: Option<&Timestamp>,
        mut callback: F,
    ) -> Result<ReplayOutcome, ApplyError>
    where
        F: FnMut(&Event, &Snapshot),
    {
        let mut outcome = ReplayOutcome::default();
        let ordered = order_refs(events);
        let end = as_of.map_or(ordered.len(), |cutoff| prefix_len(&ordered, cutoff));
        let limit = if self.config.max_events > 0 {
            self.config.max_events.min(end)
        } else {
            end
        };
        tracing::trace!(events = ordered.len(), cutoff = end, limit, "replaying timeline prefix");

        for &event in &ordered[..limit] {
            match apply_event(outcome.snapshot.as_ref(), event) {
                Ok(next) => {
                    callback(event, &next);
                    outcome.snapshot = Some(next);
                    outcome.applied += 1;
                }
                Err(err) if self.config.stop_on_error => return Err(err),
                Err(err) => {
                    tracing::debug!(event_id = %event.id, error = %err, "event rejected during replay");
                    outcome.errors.push(err);
                }
            }
        }

        Ok(outcome)
    }
}

/// Snapshot of the entity as of `as_of`, or `None` if it did not exist yet.
///
/// The returned snapshot's `as_of` is the requested time, not the time of
/// the last applied event.
///
/// # Errors
///
/// Returns the reducer's `ApplyError` if any event in the prefix is invalid
pub fn derive_snapshot(events: &[Event], as_of: &Timestamp) -> Result<Option<Snapshot>, ApplyError> {
    let outcome = ReplayEngine::new().replay(events, Some(as_of))?;
    tracing::debug!(as_of = %as_of, applied = outcome.applied, "derived snapshot");
    Ok(outcome.snapshot.map(|s| s.at(as_of.clone())))
}

/// The snapshot after every event, in timeline order
///
/// # Errors
///
/// Returns the reducer's `ApplyError` at the first invalid event
pub fn derive_history(events: &[Event]) -> Result<Vec<Snapshot>, ApplyError> {
    let mut history = Vec::with_capacity(events.len());
    ReplayEngine::new().replay_with_callback(events, None, |_, snapshot| {
        history.push(snapshot.clone());
    })?;
    Ok(history)
}
