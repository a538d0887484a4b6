//! Workflow validation — run this before registering a workflow.
//!
//! Rules enforced:
//! 1. The workflow has at least one rule, and every rule set is non-empty.
//! 2. Rule set names are unique within the workflow.
//! 3. Rule names are unique within the workflow (nested rules included).
//! 4. Composite rules declare `And`/`Or` and carry no expression; leaves
//!    carry an expression and no operator.

use std::collections::HashSet;

use crate::models::{Rule, RuleOperator, Workflow};
use crate::EngineError;

/// Validate a workflow's structure.
///
/// # Errors
/// - [`EngineError::EmptyWorkflow`] for a workflow or rule set with no rules.
/// - [`EngineError::DuplicateRule`] if two rules share a name.
/// - [`EngineError::WorkflowParse`] for duplicate rule sets or malformed rules.
pub fn validate_workflow(workflow: &Workflow) -> Result<(), EngineError> {
    // -----------------------------------------------------------------------
    // 1. Non-empty
    // -----------------------------------------------------------------------
    if workflow.rule_sets.iter().all(|set| set.rules.is_empty()) {
        return Err(EngineError::EmptyWorkflow {
            workflow: workflow.name.clone(),
            rule_set: None,
        });
    }
    if let Some(empty) = workflow.rule_sets.iter().find(|set| set.rules.is_empty()) {
        return Err(EngineError::EmptyWorkflow {
            workflow: workflow.name.clone(),
            rule_set: Some(empty.name.clone()),
        });
    }

    // -----------------------------------------------------------------------
    // 2. Unique rule set names
    // -----------------------------------------------------------------------
    let mut seen_sets: HashSet<&str> = HashSet::new();
    for set in &workflow.rule_sets {
        if !seen_sets.insert(set.name.as_str()) {
            return Err(EngineError::parse(
                &workflow.name,
                format!("duplicate rule set name '{}'", set.name),
            ));
        }
    }

    // -----------------------------------------------------------------------
    // 3 + 4. Unique rule names, well-formed rules
    // -----------------------------------------------------------------------
    let mut seen_rules: HashSet<&str> = HashSet::new();
    for rule in workflow.rule_sets.iter().flat_map(|set| &set.rules) {
        for node in rule.walk() {
            if !seen_rules.insert(node.name.as_str()) {
                return Err(EngineError::DuplicateRule {
                    workflow: workflow.name.clone(),
                    rule: node.name.clone(),
                });
            }
            check_shape(&workflow.name, node)?;
        }
    }

    Ok(())
}

fn check_shape(workflow: &str, rule: &Rule) -> Result<(), EngineError> {
    if rule.name.trim().is_empty() {
        return Err(EngineError::parse(workflow, "rule with an empty name"));
    }

    let problem = match (rule.is_leaf(), rule.operator, rule.expression.is_some()) {
        (true, RuleOperator::None, true) => None,
        (true, _, false) => Some("leaf rule has no expression"),
        (true, _, true) => Some("operator declared on a rule without child rules"),
        (false, RuleOperator::None, _) => Some("child rules declared without an operator"),
        (false, _, true) => Some("composite rule must not carry an expression"),
        (false, _, false) => None,
    };

    match problem {
        Some(message) => Err(EngineError::parse(
            workflow,
            format!("rule '{}': {message}", rule.name),
        )),
        None => Ok(()),
    }
}
