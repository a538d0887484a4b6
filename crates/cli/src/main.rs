//! `leave-rules` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the HTTP API.
//! - `validate` — load a rule source and report what it defines.
//! - `evaluate` — run one rule set against a fact file and print the outcome.

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use engine::{
    DecisionMapper, ErrorPolicy, EventTable, ExecutorConfig, FactBindings, RuleExecutor,
    SharedRegistry, WorkflowRegistry,
};
use leave::{InMemoryLeaveRequests, LeaveRequestService, ServiceConfig};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "leave-rules", about = "Rule-driven leave approval service", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, env = "LEAVE_BIND", default_value = "0.0.0.0:8080")]
        bind: String,
        #[command(flatten)]
        rules: RuleArgs,
    },
    /// Load a rule source and list its workflows and rule sets.
    Validate {
        /// Path to the rule source JSON file.
        path: PathBuf,
    },
    /// Evaluate one rule set against a JSON fact file.
    Evaluate {
        #[command(flatten)]
        rules: RuleArgs,
        /// JSON file holding the fact object.
        #[arg(long)]
        fact: PathBuf,
        /// Name the fact is bound under in expressions.
        #[arg(long, default_value = "employee")]
        binding: String,
    },
}

#[derive(Args)]
struct RuleArgs {
    #[arg(long, env = "LEAVE_RULES_PATH", default_value = "rules/leave-rules.json")]
    rules: PathBuf,
    /// Event table JSON; the built-in fatherhood table when omitted.
    #[arg(long, env = "LEAVE_EVENTS_PATH")]
    events: Option<PathBuf>,
    #[arg(long, default_value = "FatherhoodLeaveRule")]
    workflow: String,
    #[arg(long, default_value = "FatherhoodLeaveRule")]
    rule_set: String,
    /// `isolate` or `propagate`.
    #[arg(long, default_value = "isolate")]
    error_policy: ErrorPolicy,
}

impl RuleArgs {
    fn registry(&self) -> Result<WorkflowRegistry> {
        WorkflowRegistry::from_path(&self.rules)
            .with_context(|| format!("failed to load rules from {}", self.rules.display()))
    }

    fn mapper(&self) -> Result<DecisionMapper> {
        let table = match &self.events {
            Some(path) => EventTable::from_path(path)
                .with_context(|| format!("failed to load event table from {}", path.display()))?,
            None => EventTable::default(),
        };
        Ok(DecisionMapper::new(table))
    }

    fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            error_policy: self.error_policy,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Serve { bind, rules } => serve(bind, rules).await,
        Command::Validate { path } => validate(path),
        Command::Evaluate { rules, fact, binding } => evaluate(rules, fact, binding),
    }
}

async fn serve(bind: String, args: RuleArgs) -> Result<()> {
    let registry = args.registry()?;
    let config = ServiceConfig {
        workflow: args.workflow.clone(),
        rule_set: args.rule_set.clone(),
        executor: args.executor_config(),
        ..ServiceConfig::default()
    };
    // Fail at startup rather than on the first request.
    registry
        .lookup(&config.workflow, &config.rule_set)
        .context("configured rule set is not defined by the rule source")?;

    let service = LeaveRequestService::new(
        SharedRegistry::new(registry),
        args.mapper()?,
        Arc::new(InMemoryLeaveRequests::new()),
        config,
    );
    let state = api::AppState::new(service).with_rules_path(&args.rules);

    info!("starting API server on {bind}");
    api::serve(&bind, state).await.context("API server failed")
}

fn validate(path: PathBuf) -> Result<()> {
    let registry = match WorkflowRegistry::from_path(&path) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("validation failed: {e}");
            std::process::exit(1);
        }
    };

    println!("{} is valid", path.display());
    for workflow in registry.workflows() {
        println!("workflow {}", workflow.name);
        for rule_set in registry.rule_sets(&workflow.name)? {
            println!("  rule set {} ({} rules)", rule_set.name, rule_set.rules.len());
        }
    }
    Ok(())
}

fn evaluate(args: RuleArgs, fact: PathBuf, binding: String) -> Result<()> {
    let raw = std::fs::read_to_string(&fact)
        .with_context(|| format!("cannot read {}", fact.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", fact.display()))?;
    if !value.is_object() {
        bail!("{} must hold a JSON object", fact.display());
    }
    let facts = FactBindings::new().bind(binding, value);

    let executor = RuleExecutor::new(Arc::new(args.registry()?), args.executor_config());
    let results = executor.execute_all(&args.workflow, &args.rule_set, &facts)?;
    let decision = args.mapper()?.map(&results);

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "results": results, "decision": decision }))?
    );
    Ok(())
}
