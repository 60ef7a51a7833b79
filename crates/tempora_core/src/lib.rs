//! TEMPORA Core Types
//!
//! This crate contains pure types and logic with no I/O.
//! All types are serializable as JSON and round-trip losslessly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod time;
pub mod value;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use id::{EntityId, EventId};
pub use time::{Timestamp, TimestampStyle};
pub use value::{Payload, State, StateDigest};
