//! Workflow registry — loads rule sources once and serves read-only lookups.
//!
//! Source format (one workflow object, or an array of them):
//!
//! ```json
//! {
//!   "WorkflowName": "FatherhoodLeaveRule",
//!   "Rules": [
//!     {
//!       "RuleName": "TenDays",
//!       "Expression": "employee.YearsOfService >= 1 && employee.YearsOfService < 3",
//!       "SuccessEvent": "Fatherhood Leave Approved for 10 Days",
//!       "ErrorMessage": "Not eligible for 10 days"
//!     }
//!   ]
//! }
//! ```
//!
//! Top-level `Rules` form a rule set named after the workflow; further rule
//! sets are declared under `RuleSets: [{ "RuleSetName": ..., "Rules": [...] }]`.
//! Nested rules use `Operator` (`And`/`Or`) with a child `Rules` list.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value as Json;
use tracing::{info, warn};

use crate::expression::Expression;
use crate::models::{Rule, RuleOperator, RuleSet, Workflow};
use crate::validate::validate_workflow;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Source definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WorkflowDefinition {
    workflow_name: String,
    #[serde(default)]
    rules: Option<Vec<RuleDefinition>>,
    #[serde(default)]
    rule_sets: Vec<RuleSetDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RuleSetDefinition {
    rule_set_name: String,
    #[serde(default)]
    rules: Vec<RuleDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RuleDefinition {
    rule_name: String,
    #[serde(default)]
    expression: Option<String>,
    #[serde(default)]
    operator: RuleOperator,
    #[serde(default)]
    rules: Vec<RuleDefinition>,
    #[serde(default)]
    success_event: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl RuleDefinition {
    fn compile(self, origin: &str) -> Result<Rule, EngineError> {
        let expression = match self.expression.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(src) => Some(Expression::parse(src).map_err(|err| {
                EngineError::parse(origin, format!("rule '{}': expression {err}", self.rule_name))
            })?),
        };

        let children = self
            .rules
            .into_iter()
            .map(|child| child.compile(origin))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Rule {
            name: self.rule_name,
            expression,
            operator: self.operator,
            children,
            success_event: self.success_event.filter(|e| !e.is_empty()),
            error_message: self.error_message.filter(|e| !e.is_empty()),
            enabled: self.enabled,
        })
    }
}

impl WorkflowDefinition {
    fn compile(self, origin: &str) -> Result<Workflow, EngineError> {
        let mut rule_sets = Vec::with_capacity(self.rule_sets.len() + 1);

        if let Some(rules) = self.rules {
            let rules = rules
                .into_iter()
                .map(|r| r.compile(origin))
                .collect::<Result<Vec<_>, _>>()?;
            rule_sets.push(RuleSet::new(self.workflow_name.clone(), rules));
        }

        for set in self.rule_sets {
            let rules = set
                .rules
                .into_iter()
                .map(|r| r.compile(origin))
                .collect::<Result<Vec<_>, _>>()?;
            rule_sets.push(RuleSet::new(set.rule_set_name, rules));
        }

        Ok(Workflow::new(self.workflow_name, rule_sets))
    }
}

fn parse_document(source: &str, origin: &str) -> Result<Vec<WorkflowDefinition>, EngineError> {
    let doc: Json =
        serde_json::from_str(source).map_err(|err| EngineError::parse(origin, err.to_string()))?;

    match doc {
        Json::Array(_) => serde_json::from_value::<Vec<WorkflowDefinition>>(doc),
        Json::Object(_) => serde_json::from_value::<WorkflowDefinition>(doc).map(|wf| vec![wf]),
        _ => {
            return Err(EngineError::parse(
                origin,
                "expected a workflow object or an array of workflows",
            ))
        }
    }
    .map_err(|err| EngineError::parse(origin, err.to_string()))
}

// ---------------------------------------------------------------------------
// WorkflowRegistry
// ---------------------------------------------------------------------------

/// Immutable set of loaded workflows, keyed by name.
///
/// Build one at startup and share it behind an `Arc`; it is never mutated.
/// Use [`SharedRegistry`] when rule sources need to be reloaded at runtime.
#[derive(Debug, Default, Clone)]
pub struct WorkflowRegistry {
    workflows: BTreeMap<String, Workflow>,
}

impl WorkflowRegistry {
    /// Parse and validate a rule source document.
    ///
    /// `origin` names the source in error messages (a path, URL or label).
    ///
    /// # Errors
    /// Any load-time [`EngineError`]: malformed JSON or rule shape,
    /// uncompilable expression, duplicate names, empty workflow.
    pub fn load(source: &str, origin: &str) -> Result<Self, EngineError> {
        let workflows = parse_document(source, origin)?
            .into_iter()
            .map(|def| def.compile(origin))
            .collect::<Result<Vec<_>, _>>()?;

        if workflows.is_empty() {
            return Err(EngineError::parse(origin, "document declares no workflows"));
        }

        let registry = Self::from_workflows(workflows)?;
        info!(
            origin,
            workflows = registry.workflows.len(),
            "rule source loaded"
        );
        Ok(registry)
    }

    /// Read and load a rule source file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load(&raw, &path.display().to_string())
    }

    /// Register already-built workflows, validating each one.
    pub fn from_workflows(workflows: Vec<Workflow>) -> Result<Self, EngineError> {
        let mut map = BTreeMap::new();
        for workflow in workflows {
            if let Err(err) = validate_workflow(&workflow) {
                warn!(workflow = %workflow.name, error = %err, "workflow rejected");
                return Err(err);
            }
            if map.contains_key(&workflow.name) {
                return Err(EngineError::DuplicateWorkflow(workflow.name));
            }
            map.insert(workflow.name.clone(), workflow);
        }
        Ok(Self { workflows: map })
    }

    /// The ordered rules of `rule_set` within `workflow`.
    ///
    /// # Errors
    /// [`EngineError::UnknownWorkflow`] or [`EngineError::UnknownRuleSet`].
    pub fn lookup(&self, workflow: &str, rule_set: &str) -> Result<&[Rule], EngineError> {
        let wf = self
            .workflows
            .get(workflow)
            .ok_or_else(|| EngineError::UnknownWorkflow(workflow.to_owned()))?;
        wf.rule_set(rule_set)
            .map(|set| set.rules.as_slice())
            .ok_or_else(|| EngineError::UnknownRuleSet {
                workflow: workflow.to_owned(),
                rule_set: rule_set.to_owned(),
            })
    }

    pub fn workflow(&self, name: &str) -> Option<&Workflow> {
        self.workflows.get(name)
    }

    /// All workflows, ordered by name.
    pub fn workflows(&self) -> impl Iterator<Item = &Workflow> {
        self.workflows.values()
    }

    /// Rule sets of `workflow`, in declaration order.
    pub fn rule_sets(&self, workflow: &str) -> Result<impl Iterator<Item = &RuleSet>, EngineError> {
        self.workflows
            .get(workflow)
            .map(|wf| wf.rule_sets.iter())
            .ok_or_else(|| EngineError::UnknownWorkflow(workflow.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SharedRegistry
// ---------------------------------------------------------------------------

/// Hot-swappable handle to the current registry snapshot.
///
/// Readers take an `Arc` snapshot per evaluation; [`SharedRegistry::replace`]
/// swaps the whole snapshot, so in-flight evaluations keep the workflow they
/// started with.
#[derive(Debug, Clone)]
pub struct SharedRegistry {
    current: Arc<RwLock<Arc<WorkflowRegistry>>>,
}

impl SharedRegistry {
    pub fn new(registry: WorkflowRegistry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    /// The registry in effect right now.
    pub fn snapshot(&self) -> Arc<WorkflowRegistry> {
        Arc::clone(&*self.current.read())
    }

    /// Install `registry`, returning the snapshot it replaced.
    pub fn replace(&self, registry: WorkflowRegistry) -> Arc<WorkflowRegistry> {
        let next = Arc::new(registry);
        std::mem::replace(&mut *self.current.write(), next)
    }

    /// Load `path` and swap it in. On failure the current snapshot stays.
    pub fn reload_from(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Arc<WorkflowRegistry>, EngineError> {
        self.reload_checked(path, |_| Ok(()))
    }

    /// Load `path`, run `check` against it, and swap it in only if both
    /// succeed. Returns the snapshot that was installed.
    pub fn reload_checked<F>(
        &self,
        path: impl AsRef<Path>,
        check: F,
    ) -> Result<Arc<WorkflowRegistry>, EngineError>
    where
        F: FnOnce(&WorkflowRegistry) -> Result<(), EngineError>,
    {
        let registry = WorkflowRegistry::from_path(path)?;
        check(&registry)?;
        let installed = Arc::new(registry);
        *self.current.write() = Arc::clone(&installed);
        Ok(installed)
    }
}

impl From<WorkflowRegistry> for SharedRegistry {
    fn from(registry: WorkflowRegistry) -> Self {
        Self::new(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SOURCE: &str = r#"
    {
      "WorkflowName": "Leave",
      "Rules": [
        {
          "RuleName": "Senior",
          "Operator": "OrElse",
          "SuccessEvent": "long",
          "Rules": [
            { "RuleName": "Veteran", "Expression": "employee.YearsOfService >= 5" },
            { "RuleName": "Manager", "Expression": "employee.IsManager == true" }
          ]
        },
        {
          "RuleName": "Junior",
          "Expression": "employee.YearsOfService < 5",
          "SuccessEvent": "short",
          "ErrorMessage": "too senior",
          "RuleExpressionType": "LambdaExpression"
        }
      ],
      "RuleSets": [
        {
          "RuleSetName": "Probation",
          "Rules": [ { "RuleName": "New", "Expression": "employee.YearsOfService < 1" } ]
        }
      ]
    }"#;

    const OTHER: &str =
        r#"{ "WorkflowName": "Other", "Rules": [ { "RuleName": "x", "Expression": "true" } ] }"#;

    #[test]
    fn loads_workflow_with_nested_rules_and_extra_rule_sets() {
        let registry = WorkflowRegistry::load(SOURCE, "inline").unwrap();

        let rules = registry.lookup("Leave", "Leave").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name, "Senior");
        assert_eq!(rules[0].operator, RuleOperator::Or);
        assert_eq!(rules[0].children.len(), 2);
        assert_eq!(rules[1].error_message.as_deref(), Some("too senior"));

        let probation = registry.lookup("Leave", "Probation").unwrap();
        assert_eq!(probation[0].name, "New");
        assert_eq!(registry.workflow("Leave").unwrap().rule_count(), 5);
    }

    #[test]
    fn accepts_an_array_of_workflows() {
        let source = r#"[
          { "WorkflowName": "A", "Rules": [ { "RuleName": "a", "Expression": "true" } ] },
          { "WorkflowName": "B", "Rules": [ { "RuleName": "a", "Expression": "false" } ] }
        ]"#;
        let registry = WorkflowRegistry::load(source, "inline").unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.workflows().map(|w| w.name.as_str()).collect::<Vec<_>>(),
            vec!["A", "B"]
        );
    }

    #[test]
    fn unknown_names_are_distinct_errors() {
        let registry = WorkflowRegistry::load(SOURCE, "inline").unwrap();
        assert!(matches!(
            registry.lookup("Nope", "Leave"),
            Err(EngineError::UnknownWorkflow(w)) if w == "Nope"
        ));
        assert!(matches!(
            registry.lookup("Leave", "Nope"),
            Err(EngineError::UnknownRuleSet { rule_set, .. }) if rule_set == "Nope"
        ));
    }

    #[test]
    fn zero_rules_is_an_empty_workflow() {
        for source in [
            r#"{ "WorkflowName": "Empty", "Rules": [] }"#,
            r#"{ "WorkflowName": "Empty" }"#,
        ] {
            assert!(matches!(
                WorkflowRegistry::load(source, "inline"),
                Err(EngineError::EmptyWorkflow { workflow, .. }) if workflow == "Empty"
            ));
        }
    }

    #[test]
    fn malformed_sources_are_parse_errors() {
        for source in [
            "not json",
            "42",
            "[]",
            r#"{ "Rules": [] }"#,
            r#"{ "WorkflowName": "W", "Rules": [ { "RuleName": "r", "Expression": "a >" } ] }"#,
        ] {
            assert!(
                matches!(
                    WorkflowRegistry::load(source, "inline"),
                    Err(EngineError::WorkflowParse { .. })
                ),
                "expected parse error for {source}"
            );
        }
    }

    #[test]
    fn expression_errors_name_the_rule() {
        let source =
            r#"{ "WorkflowName": "W", "Rules": [ { "RuleName": "broken", "Expression": "(x" } ] }"#;
        let err = WorkflowRegistry::load(source, "inline").unwrap_err();
        assert!(err.to_string().contains("rule 'broken'"), "{err}");
    }

    #[test]
    fn duplicate_workflows_are_rejected() {
        let source = r#"[
          { "WorkflowName": "A", "Rules": [ { "RuleName": "a", "Expression": "true" } ] },
          { "WorkflowName": "A", "Rules": [ { "RuleName": "b", "Expression": "true" } ] }
        ]"#;
        assert!(matches!(
            WorkflowRegistry::load(source, "inline"),
            Err(EngineError::DuplicateWorkflow(name)) if name == "A"
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            WorkflowRegistry::from_path("/definitely/not/here.json"),
            Err(EngineError::Io { .. })
        ));
    }

    #[test]
    fn shared_registry_swaps_whole_snapshots() {
        let shared = SharedRegistry::new(WorkflowRegistry::load(SOURCE, "inline").unwrap());
        let before = shared.snapshot();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{OTHER}").unwrap();
        shared.reload_from(file.path()).unwrap();

        // The old snapshot is untouched; new readers see the new one.
        assert!(before.workflow("Leave").is_some());
        assert!(shared.snapshot().workflow("Leave").is_none());
        assert!(shared.snapshot().workflow("Other").is_some());
    }

    #[test]
    fn reload_returns_the_installed_snapshot() {
        let shared = SharedRegistry::new(WorkflowRegistry::load(SOURCE, "inline").unwrap());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{OTHER}").unwrap();
        let installed = shared.reload_from(file.path()).unwrap();

        assert!(installed.workflow("Other").is_some());
        assert!(Arc::ptr_eq(&installed, &shared.snapshot()));
    }

    #[test]
    fn rejected_check_keeps_current_snapshot() {
        let shared = SharedRegistry::new(WorkflowRegistry::load(SOURCE, "inline").unwrap());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{OTHER}").unwrap();

        let err = shared
            .reload_checked(file.path(), |next| next.lookup("Leave", "Leave").map(|_| ()))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownWorkflow(name) if name == "Leave"));
        assert!(shared.snapshot().workflow("Leave").is_some());
        assert!(shared.snapshot().workflow("Other").is_none());
    }

    #[test]
    fn replace_hands_back_the_previous_snapshot() {
        let shared = SharedRegistry::new(WorkflowRegistry::load(SOURCE, "inline").unwrap());
        let previous = shared.replace(WorkflowRegistry::load(OTHER, "inline").unwrap());
        assert!(previous.workflow("Leave").is_some());
        assert!(shared.snapshot().workflow("Other").is_some());
    }

    #[test]
    fn rule_sets_list_in_declaration_order() {
        let registry = WorkflowRegistry::load(SOURCE, "inline").unwrap();
        let names: Vec<&str> = registry
            .rule_sets("Leave")
            .unwrap()
            .map(|set| set.name.as_str())
            .collect();
        assert_eq!(names, vec!["Leave", "Probation"]);
        assert!(matches!(registry.rule_sets("Nope"), Err(EngineError::UnknownWorkflow(_))));
    }

    #[test]
    fn failed_reload_keeps_current_snapshot() {
        let shared = SharedRegistry::new(WorkflowRegistry::load(SOURCE, "inline").unwrap());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "WorkflowName": "Broken", "Rules": [] }}"#).unwrap();

        assert!(shared.reload_from(file.path()).is_err());
        assert!(shared.snapshot().workflow("Leave").is_some());
    }
}
