//! Leave approval service: evaluate → decide → record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use engine::{
    Decision, DecisionMapper, ExecutorConfig, FactBindings, RuleExecutor, RuleResult,
    SharedRegistry,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{Employee, LeaveError, LeaveRequest, LeaveRequestRepository};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which rules the service evaluates, and how.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub workflow: String,
    pub rule_set: String,
    /// Name the employee is bound under in rule expressions.
    pub fact_name: String,
    pub executor: ExecutorConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workflow: "FatherhoodLeaveRule".to_owned(),
            rule_set: "FatherhoodLeaveRule".to_owned(),
            fact_name: "employee".to_owned(),
            executor: ExecutorConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The decision plus the record created for it, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveOutcome {
    #[serde(flatten)]
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<LeaveRequest>,
}

// ---------------------------------------------------------------------------
// LeaveRequestService
// ---------------------------------------------------------------------------

pub struct LeaveRequestService {
    registry: SharedRegistry,
    mapper: DecisionMapper,
    repository: Arc<dyn LeaveRequestRepository>,
    config: ServiceConfig,
}

impl LeaveRequestService {
    pub fn new(
        registry: SharedRegistry,
        mapper: DecisionMapper,
        repository: Arc<dyn LeaveRequestRepository>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            registry,
            mapper,
            repository,
            config,
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn mapper(&self) -> &DecisionMapper {
        &self.mapper
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn LeaveRequestRepository> {
        &self.repository
    }

    /// An executor over the registry snapshot in effect right now.
    pub fn executor(&self) -> RuleExecutor {
        RuleExecutor::new(self.registry.snapshot(), self.config.executor.clone())
    }

    /// Run the configured rule set against `employee`.
    pub fn evaluate(&self, employee: &Employee) -> Result<Vec<RuleResult>, LeaveError> {
        let facts = FactBindings::from_fact(&self.config.fact_name, employee)?;
        let results = self
            .executor()
            .execute_all(&self.config.workflow, &self.config.rule_set, &facts)?;
        Ok(results)
    }

    /// Decide on a leave request starting now.
    pub async fn approve(&self, employee: &Employee) -> Result<LeaveOutcome, LeaveError> {
        self.approve_at(employee, Utc::now()).await
    }

    /// Decide on a leave request starting at `start`. Approved decisions are
    /// recorded through the repository; rejections store nothing.
    #[instrument(skip(self, employee), fields(employee_id = employee.id))]
    pub async fn approve_at(
        &self,
        employee: &Employee,
        start: DateTime<Utc>,
    ) -> Result<LeaveOutcome, LeaveError> {
        let results = self.evaluate(employee)?;
        let decision = self.mapper.map(&results);

        if !decision.approved {
            info!("leave not approved");
            return Ok(LeaveOutcome {
                decision,
                request: None,
            });
        }

        let request = self
            .repository
            .insert(LeaveRequest::approved(employee.id, start, decision.duration_days)?)
            .await?;
        info!(
            request_id = %request.id,
            days = decision.duration_days,
            "leave approved and recorded"
        );

        Ok(LeaveOutcome {
            decision,
            request: Some(request),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryLeaveRequests;
    use chrono::TimeZone;
    use engine::{EngineError, EventTable, WorkflowRegistry};

    const SAMPLE_RULES: &str = include_str!("../../../rules/leave-rules.json");

    fn service_with(
        repo: Arc<InMemoryLeaveRequests>,
        config: ServiceConfig,
    ) -> LeaveRequestService {
        let registry = WorkflowRegistry::load(SAMPLE_RULES, "leave-rules.json").unwrap();
        LeaveRequestService::new(
            SharedRegistry::new(registry),
            DecisionMapper::new(EventTable::default()),
            repo,
            config,
        )
    }

    #[tokio::test]
    async fn approval_records_a_request_for_the_granted_window() {
        let repo = Arc::new(InMemoryLeaveRequests::new());
        let service = service_with(repo.clone(), ServiceConfig::default());
        let start = Utc.with_ymd_and_hms(2024, 8, 7, 9, 0, 0).unwrap();

        let outcome = service
            .approve_at(&Employee::new(42, "Omar", 2.0), start)
            .await
            .unwrap();

        assert_eq!(outcome.decision, Decision::approved(10, "Leave Approved for 10 Days"));
        let request = outcome.request.expect("request recorded");
        assert_eq!(request.employee_id, 42);
        assert_eq!(request.start_date, start);
        assert_eq!(request.end_date, Utc.with_ymd_and_hms(2024, 8, 17, 9, 0, 0).unwrap());
        assert_eq!(repo.list_for_employee(42).await.unwrap(), vec![request]);
    }

    #[tokio::test]
    async fn rejection_stores_nothing() {
        let repo = Arc::new(InMemoryLeaveRequests::new());
        let service = service_with(repo.clone(), ServiceConfig::default());

        let outcome = service.approve(&Employee::new(1, "New Hire", 0.1)).await.unwrap();

        assert_eq!(outcome.decision, Decision::not_approved());
        assert!(outcome.request.is_none());
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn managers_get_the_month_rule() {
        let repo = Arc::new(InMemoryLeaveRequests::new());
        let service = service_with(repo, ServiceConfig::default());

        let outcome = service
            .approve(&Employee::new(5, "Lead", 3.0).manager())
            .await
            .unwrap();
        assert_eq!(outcome.decision.duration_days, 30);
    }

    #[tokio::test]
    async fn misconfigured_workflow_is_an_engine_error() {
        let repo = Arc::new(InMemoryLeaveRequests::new());
        let config = ServiceConfig {
            workflow: "MissingWorkflow".into(),
            ..ServiceConfig::default()
        };
        let service = service_with(repo, config);

        let err = service.approve(&Employee::new(1, "x", 2.0)).await.unwrap_err();
        assert!(matches!(err, LeaveError::Engine(EngineError::UnknownWorkflow(_))));
    }

    #[tokio::test]
    async fn oversized_table_duration_is_an_error() {
        let repo = Arc::new(InMemoryLeaveRequests::new());
        let registry = WorkflowRegistry::load(SAMPLE_RULES, "leave-rules.json").unwrap();
        let table = EventTable::default().with(
            "Fatherhood Leave Approved for 10 Days",
            u32::MAX,
            "Forever",
        );
        let service = LeaveRequestService::new(
            SharedRegistry::new(registry),
            DecisionMapper::new(table),
            repo.clone(),
            ServiceConfig::default(),
        );

        let err = service.approve(&Employee::new(3, "Ravi", 2.0)).await.unwrap_err();
        assert!(matches!(err, LeaveError::DateOutOfRange { days, .. } if days == u32::MAX));
        assert!(repo.is_empty().await);
    }

    #[test]
    fn outcome_flattens_the_decision() {
        let outcome = LeaveOutcome {
            decision: Decision::not_approved(),
            request: None,
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({
                "approved": false,
                "durationDays": 0,
                "message": "Leave Not Approved"
            })
        );
    }
}
