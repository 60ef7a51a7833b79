//! TEMPORA Event Log
//!
//! Write-once entity events, their deterministic `(timestamp, id)` ordering,
//! and JSON / JSON Lines encoding of whole logs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event;
pub mod encoding;
pub mod partition;
pub mod timeline;

pub use event::{Event, EventType, RecordError};
pub use encoding::{EncodingError, LogFormat, LogReader, LogWriter};
pub use partition::partition_by_entity;
pub use timeline::{build_timeline, Timeline};
