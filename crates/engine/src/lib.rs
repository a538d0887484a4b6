//! `engine` crate — rule models, expression evaluation, workflow registry,
//! rule-tree execution, and decision mapping.

pub mod models;
pub mod error;
pub mod expression;
pub mod facts;
pub mod validate;
pub mod registry;
pub mod executor;
pub mod decision;

pub use models::{Rule, RuleOperator, RuleResult, RuleSet, Workflow};
pub use error::{EngineError, EvaluationError};
pub use expression::{Expression, ParseError, Value};
pub use facts::FactBindings;
pub use validate::validate_workflow;
pub use registry::{SharedRegistry, WorkflowRegistry};
pub use executor::{ErrorPolicy, ExecutorConfig, RuleExecutor};
pub use decision::{Decision, DecisionMapper, EventOutcome, EventTable, NOT_APPROVED_MESSAGE};
