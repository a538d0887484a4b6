//! Rule tree execution engine.
//!
//! `RuleExecutor` is the central evaluator:
//! 1. Looks up the ordered rules of a rule set in the injected registry.
//! 2. Walks each enabled top-level rule in declaration order.
//! 3. Leaves evaluate their expression against the fact bindings; composites
//!    evaluate every enabled child (no short-circuit) and combine the
//!    outcomes with the rule's operator.
//! 4. Leaf evaluation failures are recorded in the result tree
//!    (`ErrorPolicy::Isolate`) or abort the call (`ErrorPolicy::Propagate`).

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::expression::Value;
use crate::models::{Rule, RuleOperator, RuleResult};
use crate::registry::WorkflowRegistry;
use crate::{EngineError, EvaluationError, FactBindings};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a leaf expression fails to evaluate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Mark the leaf as failed, record the error, keep evaluating siblings.
    #[default]
    Isolate,
    /// Abort the whole call with [`EngineError::Evaluation`].
    Propagate,
}

impl std::str::FromStr for ErrorPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "isolate" => Ok(Self::Isolate),
            "propagate" => Ok(Self::Propagate),
            other => Err(format!("unknown error policy: {other}")),
        }
    }
}

/// Tuning knobs for the executor.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    pub error_policy: ErrorPolicy,
}

// ---------------------------------------------------------------------------
// RuleExecutor
// ---------------------------------------------------------------------------

/// Stateless evaluator over an immutable registry snapshot.
///
/// Cheap to construct: build one per call from
/// [`SharedRegistry::snapshot`](crate::SharedRegistry::snapshot), or keep one
/// around when the registry never changes.
#[derive(Debug, Clone)]
pub struct RuleExecutor {
    registry: Arc<WorkflowRegistry>,
    config: ExecutorConfig,
}

impl RuleExecutor {
    pub fn new(registry: Arc<WorkflowRegistry>, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    /// Execute every enabled top-level rule of `rule_set`, in declaration order.
    ///
    /// # Errors
    /// Unknown workflow / rule set, or a leaf failure under
    /// [`ErrorPolicy::Propagate`].
    #[instrument(skip(self, facts))]
    pub fn execute_all(
        &self,
        workflow: &str,
        rule_set: &str,
        facts: &FactBindings,
    ) -> Result<Vec<RuleResult>, EngineError> {
        let rules = self.registry.lookup(workflow, rule_set)?;

        let mut results = Vec::with_capacity(rules.len());
        for rule in rules.iter().filter(|r| r.enabled) {
            results.push(self.execute_one(rule, facts)?);
        }

        info!(
            evaluated = results.len(),
            succeeded = results.iter().filter(|r| r.is_success).count(),
            "rule set executed"
        );
        Ok(results)
    }

    /// Execute a single rule (and its subtree).
    ///
    /// # Errors
    /// Only under [`ErrorPolicy::Propagate`], when a leaf fails to evaluate.
    pub fn execute_one(
        &self,
        rule: &Rule,
        facts: &FactBindings,
    ) -> Result<RuleResult, EngineError> {
        if rule.is_leaf() {
            return self.execute_leaf(rule, facts);
        }

        // Every enabled child runs so the result tree is complete.
        let child_results = rule
            .children
            .iter()
            .filter(|child| child.enabled)
            .map(|child| self.execute_one(child, facts))
            .collect::<Result<Vec<_>, _>>()?;

        let is_success = !child_results.is_empty()
            && match rule.operator {
                RuleOperator::Or => child_results.iter().any(|c| c.is_success),
                // Validation rejects `None` on composites; treat it as `And` here.
                RuleOperator::And | RuleOperator::None => {
                    child_results.iter().all(|c| c.is_success)
                }
            };

        debug!(
            rule = %rule.name,
            operator = ?rule.operator,
            is_success,
            "composite rule evaluated"
        );
        Ok(finish(rule, is_success, None, child_results))
    }

    fn execute_leaf(&self, rule: &Rule, facts: &FactBindings) -> Result<RuleResult, EngineError> {
        let outcome = match &rule.expression {
            Some(expression) => expression.evaluate(facts).and_then(|value| match value {
                Value::Bool(b) => Ok(b),
                other => Err(EvaluationError::NonBoolean(other.type_name())),
            }),
            None => {
                warn!(rule = %rule.name, "leaf rule without an expression");
                Ok(false)
            }
        };

        match outcome {
            Ok(is_success) => {
                debug!(rule = %rule.name, is_success, "leaf rule evaluated");
                Ok(finish(rule, is_success, None, Vec::new()))
            }
            Err(err) => match self.config.error_policy {
                ErrorPolicy::Isolate => {
                    warn!(
                        rule = %rule.name,
                        error = %err,
                        "rule evaluation failed; recorded as failure"
                    );
                    Ok(finish(rule, false, Some(err.to_string()), Vec::new()))
                }
                ErrorPolicy::Propagate => Err(EngineError::Evaluation {
                    rule: rule.name.clone(),
                    source: err,
                }),
            },
        }
    }
}

fn finish(
    rule: &Rule,
    is_success: bool,
    exception: Option<String>,
    child_results: Vec<RuleResult>,
) -> RuleResult {
    RuleResult {
        rule_name: rule.name.clone(),
        is_success,
        success_event: if is_success { rule.success_event.clone() } else { None },
        error_message: if is_success { None } else { rule.error_message.clone() },
        exception,
        child_results,
    }
}
