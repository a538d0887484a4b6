//! Leave domain models: the `Employee` fact and the `LeaveRequest` record.
//!
//! `Employee` is what rule expressions see under the `employee` binding, so
//! its field names are part of the rule-authoring surface
//! (`employee.YearsOfService`). `LeaveRequest` is the record produced for an
//! approved decision; storing it is the repository's job.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::LeaveError;

// ---------------------------------------------------------------------------
// Employee
// ---------------------------------------------------------------------------

/// The employee requesting leave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Employee {
    #[serde(alias = "id")]
    pub id: i64,
    #[serde(default, alias = "name")]
    pub name: String,
    #[serde(alias = "yearsOfService")]
    pub years_of_service: f64,
    #[serde(default, alias = "isManager")]
    pub is_manager: bool,
    /// Any further attributes, addressable from rules as `employee.<Key>`.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Employee {
    pub fn new(id: i64, name: impl Into<String>, years_of_service: f64) -> Self {
        Self {
            id,
            name: name.into(),
            years_of_service,
            is_manager: false,
            attributes: Map::new(),
        }
    }

    pub fn manager(mut self) -> Self {
        self.is_manager = true;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// LeaveRequest
// ---------------------------------------------------------------------------

/// A recorded leave request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: Uuid,
    pub employee_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_approved: bool,
    /// Supporting paperwork; never present at creation time.
    pub is_file_uploaded: bool,
}

impl LeaveRequest {
    /// An approved request starting at `start` and lasting `duration_days`.
    ///
    /// # Errors
    /// [`LeaveError::DateOutOfRange`] when the end date would overflow.
    pub fn approved(
        employee_id: i64,
        start: DateTime<Utc>,
        duration_days: u32,
    ) -> Result<Self, LeaveError> {
        let end_date = start
            .checked_add_signed(Duration::days(i64::from(duration_days)))
            .ok_or(LeaveError::DateOutOfRange {
                start,
                days: duration_days,
            })?;
        Ok(Self {
            id: Uuid::new_v4(),
            employee_id,
            start_date: start,
            end_date,
            is_approved: true,
            is_file_uploaded: false,
        })
    }

    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}
