//! `leave` crate — fatherhood-leave approval on top of the rules engine.
//!
//! Binds an [`Employee`] as a fact, runs the configured rule set, maps the
//! outcome to a decision, and records approved requests through a
//! [`LeaveRequestRepository`].

pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use error::LeaveError;
pub use models::{Employee, LeaveRequest};
pub use repository::{InMemoryLeaveRequests, LeaveRequestRepository};
pub use service::{LeaveOutcome, LeaveRequestService, ServiceConfig};
