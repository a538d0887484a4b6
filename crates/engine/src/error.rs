//! Engine-level error types.

use std::fmt;

use thiserror::Error;

use crate::expression::Value;

/// Errors produced by the rules engine (loading + lookup + propagated evaluation).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Load-time errors (fatal: the workflow cannot be served) ------

    /// The rule source could not be read.
    #[error("failed to read rule source {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The rule source is malformed: bad JSON, bad rule shape, or an
    /// expression that does not compile.
    #[error("malformed workflow source {origin}: {message}")]
    WorkflowParse { origin: String, message: String },

    /// A workflow (or one of its declared rule sets) has no rules.
    #[error("workflow '{workflow}' has no rules{}", rule_set_suffix(.rule_set))]
    EmptyWorkflow {
        workflow: String,
        rule_set: Option<String>,
    },

    /// Two workflows share a name.
    #[error("duplicate workflow name: '{0}'")]
    DuplicateWorkflow(String),

    /// Two rules in one workflow share a name.
    #[error("duplicate rule name '{rule}' in workflow '{workflow}'")]
    DuplicateRule { workflow: String, rule: String },

    /// The success-event table could not be parsed.
    #[error("malformed event table {origin}: {message}")]
    EventTable { origin: String, message: String },

    // ------ Per-call errors ------

    /// The caller named a workflow that is not loaded.
    #[error("unknown workflow: '{0}'")]
    UnknownWorkflow(String),

    /// The workflow exists but has no rule set by that name.
    #[error("workflow '{workflow}' has no rule set '{rule_set}'")]
    UnknownRuleSet { workflow: String, rule_set: String },

    /// A leaf failed to evaluate and the executor runs with
    /// [`ErrorPolicy::Propagate`](crate::ErrorPolicy::Propagate).
    #[error("rule '{rule}' failed to evaluate: {source}")]
    Evaluation {
        rule: String,
        #[source]
        source: EvaluationError,
    },
}

impl EngineError {
    pub(crate) fn parse(origin: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::WorkflowParse {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Whether the error means the engine is misconfigured. Surfaces map these
    /// to a server-side failure.
    ///
    /// Unknown workflow / rule set names are lookup errors and return `false`:
    /// they blame whoever chose the name. A caller that picks the name from its
    /// own configuration should still treat them as server-side.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            EngineError::UnknownWorkflow(_) | EngineError::UnknownRuleSet { .. }
        )
    }
}

fn rule_set_suffix(rule_set: &Option<String>) -> String {
    rule_set
        .as_ref()
        .map(|name| format!(" in rule set '{name}'"))
        .unwrap_or_default()
}

/// Errors raised while evaluating a single expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// A field path does not exist in the fact bindings.
    #[error("unresolved reference '{0}'")]
    UnresolvedReference(String),

    /// An operator was applied to operands of incompatible types.
    #[error("type mismatch: cannot apply '{op}' to {operands}")]
    TypeMismatch { op: String, operands: String },

    #[error("division by zero")]
    DivisionByZero,

    /// A leaf rule's expression produced something other than a bool.
    #[error("rule expression produced {0}, expected bool")]
    NonBoolean(&'static str),
}

impl EvaluationError {
    pub(crate) fn unary_mismatch(op: &str, operand: &Value) -> Self {
        EvaluationError::TypeMismatch {
            op: op.to_owned(),
            operands: operand.type_name().to_owned(),
        }
    }

    pub(crate) fn binary_mismatch(op: &dyn fmt::Display, lhs: &Value, rhs: Option<&Value>) -> Self {
        let operands = match rhs {
            Some(rhs) => format!("{} and {}", lhs.type_name(), rhs.type_name()),
            None => lhs.type_name().to_owned(),
        };
        EvaluationError::TypeMismatch {
            op: op.to_string(),
            operands,
        }
    }
}
