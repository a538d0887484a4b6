//! Core domain models for the rules engine.
//!
//! A [`Workflow`] groups ordered [`RuleSet`]s; a [`Rule`] is either a leaf
//! carrying a compiled [`Expression`] or a composite combining child rules
//! with a [`RuleOperator`]. Executing rules yields a [`RuleResult`] tree.

use serde::{Deserialize, Serialize};

use crate::expression::{Expression, ParseError};

// ---------------------------------------------------------------------------
// RuleOperator
// ---------------------------------------------------------------------------

/// How a composite rule combines the outcomes of its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleOperator {
    /// Success iff every child succeeds.
    #[serde(alias = "AndAlso", alias = "and", alias = "AND")]
    And,
    /// Success iff at least one child succeeds.
    #[serde(alias = "OrElse", alias = "or", alias = "OR")]
    Or,
    /// Leaf rule: no children to combine.
    #[default]
    None,
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A named node in a rule tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Unique within the owning workflow.
    pub name: String,
    /// Set on leaves only.
    pub expression: Option<Expression>,
    pub operator: RuleOperator,
    /// Evaluated in declaration order.
    pub children: Vec<Rule>,
    /// Label attached to the result when this rule succeeds.
    pub success_event: Option<String>,
    /// Author-supplied message attached to the result when this rule fails.
    pub error_message: Option<String>,
    /// Disabled rules are skipped by the executor.
    pub enabled: bool,
}

impl Rule {
    /// Build a leaf rule from an expression string.
    pub fn leaf(name: impl Into<String>, expression: &str) -> Result<Self, ParseError> {
        Ok(Self {
            name: name.into(),
            expression: Some(Expression::parse(expression)?),
            operator: RuleOperator::None,
            children: Vec::new(),
            success_event: None,
            error_message: None,
            enabled: true,
        })
    }

    /// Build a composite rule over `children`.
    pub fn composite(name: impl Into<String>, operator: RuleOperator, children: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            expression: None,
            operator,
            children,
            success_event: None,
            error_message: None,
            enabled: true,
        }
    }

    pub fn with_success_event(mut self, event: impl Into<String>) -> Self {
        self.success_event = Some(event.into());
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// This rule and all of its descendants, depth-first in declaration order.
    pub fn walk(&self) -> Vec<&Rule> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// RuleSet / Workflow
// ---------------------------------------------------------------------------

/// An ordered, named group of top-level rules inside a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    pub name: String,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }
}

/// A complete, loaded workflow. Read-only once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    pub name: String,
    pub rule_sets: Vec<RuleSet>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, rule_sets: Vec<RuleSet>) -> Self {
        Self {
            name: name.into(),
            rule_sets,
        }
    }

    /// A workflow with a single rule set named after the workflow itself.
    pub fn single(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        let name = name.into();
        Self {
            rule_sets: vec![RuleSet::new(name.clone(), rules)],
            name,
        }
    }

    pub fn rule_set(&self, name: &str) -> Option<&RuleSet> {
        self.rule_sets.iter().find(|set| set.name == name)
    }

    /// Number of rules across all rule sets, nested rules included.
    pub fn rule_count(&self) -> usize {
        self.rule_sets
            .iter()
            .flat_map(|set| &set.rules)
            .map(|rule| rule.walk().len())
            .sum()
    }
}

// ---------------------------------------------------------------------------
// RuleResult
// ---------------------------------------------------------------------------

/// Outcome of executing one rule; composites carry their children's results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResult {
    pub rule_name: String,
    pub is_success: bool,
    /// The rule's declared success event, present only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_event: Option<String>,
    /// The rule's declared error message, present only on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Evaluation error recorded in place of aborting the tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_results: Vec<RuleResult>,
}

impl RuleResult {
    /// Depth-first search for a result by rule name.
    pub fn find(&self, rule_name: &str) -> Option<&RuleResult> {
        if self.rule_name == rule_name {
            return Some(self);
        }
        self.child_results.iter().find_map(|child| child.find(rule_name))
    }
}
