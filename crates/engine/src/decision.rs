//! Decision mapper — reduces a rule result list to a business decision.
//!
//! Rule authors choose success-event labels; operators map those labels to
//! a leave duration and message through an [`EventTable`]. The two are kept
//! apart so changing a duration never means editing rules.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::RuleResult;
use crate::EngineError;

/// Message used for every negative decision.
pub const NOT_APPROVED_MESSAGE: &str = "Leave Not Approved";

// ---------------------------------------------------------------------------
// Event table
// ---------------------------------------------------------------------------

/// What a recognised success event grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOutcome {
    pub duration_days: u32,
    pub message: String,
}

/// Static mapping from success-event label to [`EventOutcome`].
///
/// JSON form: `{ "<event>": { "durationDays": 10, "message": "..." } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTable(BTreeMap<String, EventOutcome>);

impl EventTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(
        mut self,
        event: impl Into<String>,
        duration_days: u32,
        message: impl Into<String>,
    ) -> Self {
        self.0.insert(
            event.into(),
            EventOutcome {
                duration_days,
                message: message.into(),
            },
        );
        self
    }

    pub fn get(&self, event: &str) -> Option<&EventOutcome> {
        self.0.get(event)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json(raw: &str, origin: &str) -> Result<Self, EngineError> {
        serde_json::from_str(raw).map_err(|err| EngineError::EventTable {
            origin: origin.to_owned(),
            message: err.to_string(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw, &path.display().to_string())
    }
}

impl Default for EventTable {
    /// The built-in fatherhood-leave durations.
    fn default() -> Self {
        Self::new()
            .with("Fatherhood Leave Approved for 1 Month", 30, "Leave Approved for 30 Days")
            .with("Fatherhood Leave Approved for 3 Weeks", 21, "Leave Approved for 21 Days")
            .with("Fatherhood Leave Approved for 10 Days", 10, "Leave Approved for 10 Days")
            .with("Fatherhood Leave Approved for 1 Week", 7, "Leave Approved for 7 Days")
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Business outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub approved: bool,
    /// Zero whenever `approved` is false.
    pub duration_days: u32,
    pub message: String,
}

impl Decision {
    pub fn not_approved() -> Self {
        Self {
            approved: false,
            duration_days: 0,
            message: NOT_APPROVED_MESSAGE.to_owned(),
        }
    }

    pub fn approved(duration_days: u32, message: impl Into<String>) -> Self {
        Self {
            approved: true,
            duration_days,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// DecisionMapper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct DecisionMapper {
    table: EventTable,
}

impl DecisionMapper {
    pub fn new(table: EventTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &EventTable {
        &self.table
    }

    /// Pick the first successful top-level result (declaration order) and
    /// translate its success event through the table.
    ///
    /// A successful rule whose event is missing from the table, or maps to
    /// zero days, still yields a negative decision.
    pub fn map(&self, results: &[RuleResult]) -> Decision {
        let Some(winner) = results.iter().find(|r| r.is_success) else {
            debug!("no rule matched");
            return Decision::not_approved();
        };

        let Some(event) = winner.success_event.as_deref() else {
            warn!(rule = %winner.rule_name, "successful rule declares no success event");
            return Decision::not_approved();
        };

        match self.table.get(event) {
            Some(outcome) if outcome.duration_days > 0 => {
                debug!(
                    rule = %winner.rule_name,
                    event,
                    days = outcome.duration_days,
                    "leave approved"
                );
                Decision::approved(outcome.duration_days, outcome.message.clone())
            }
            Some(_) => {
                warn!(rule = %winner.rule_name, event, "success event maps to zero days");
                Decision::not_approved()
            }
            None => {
                warn!(rule = %winner.rule_name, event, "success event not in event table");
                Decision::not_approved()
            }
        }
    }
}
