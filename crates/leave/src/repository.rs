//! Leave request storage — the `LeaveRequestRepository` seam and an
//! in-memory implementation.
//!
//! The rules engine only produces decisions; where the resulting records
//! live is up to the deployment. Implement [`LeaveRequestRepository`] for a
//! real database.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{LeaveError, LeaveRequest};

/// Persistence contract for leave requests.
#[async_trait]
pub trait LeaveRequestRepository: Send + Sync {
    /// Store a new request and return it as stored.
    async fn insert(&self, request: LeaveRequest) -> Result<LeaveRequest, LeaveError>;

    /// All requests of one employee, oldest first.
    async fn list_for_employee(&self, employee_id: i64) -> Result<Vec<LeaveRequest>, LeaveError>;

    /// Every stored request, oldest first.
    async fn all(&self) -> Result<Vec<LeaveRequest>, LeaveError>;
}

/// Process-local repository backed by a `Vec`.
#[derive(Debug, Default)]
pub struct InMemoryLeaveRequests {
    rows: RwLock<Vec<LeaveRequest>>,
}

impl InMemoryLeaveRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl LeaveRequestRepository for InMemoryLeaveRequests {
    async fn insert(&self, request: LeaveRequest) -> Result<LeaveRequest, LeaveError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|row| row.id == request.id) {
            return Err(LeaveError::Duplicate(request.id));
        }
        rows.push(request.clone());
        Ok(request)
    }

    async fn list_for_employee(&self, employee_id: i64) -> Result<Vec<LeaveRequest>, LeaveError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|row| row.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<LeaveRequest>, LeaveError> {
        Ok(self.rows.read().await.clone())
    }
}
