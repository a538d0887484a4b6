//! Typed error type for the leave crate.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LeaveError {
    /// The rules engine rejected the call (misconfigured workflow, or a
    /// propagated evaluation failure).
    #[error(transparent)]
    Engine(#[from] engine::EngineError),

    /// The employee could not be turned into a fact binding.
    #[error("employee could not be bound as a fact: {0}")]
    Fact(#[from] serde_json::Error),

    /// The granted duration does not fit in a calendar date range.
    #[error("a leave of {days} days starting {start} is out of the representable date range")]
    DateOutOfRange { start: DateTime<Utc>, days: u32 },

    /// A leave request with this id is already recorded.
    #[error("leave request {0} already exists")]
    Duplicate(Uuid),
}
