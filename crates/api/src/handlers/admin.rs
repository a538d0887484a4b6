use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::info;

use super::AppState;
use crate::ApiError;

pub async fn health() -> &'static str {
    "ok"
}

/// `POST /admin/reload`: swap in a freshly loaded registry. A source that
/// fails to load, or no longer defines the rule set the service approves
/// against, leaves the running rules untouched.
pub async fn reload(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let path = state
        .rules_path
        .clone()
        .ok_or_else(|| ApiError::Internal("no rule source configured for reload".into()))?;

    let registry = state.service.registry().clone();
    let config = state.service.config().clone();
    let loaded = tokio::task::spawn_blocking(move || {
        registry.reload_checked(&path, |next| {
            next.lookup(&config.workflow, &config.rule_set).map(|_| ())
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("reload task failed: {e}")))??;

    let workflows: Vec<&str> = loaded.workflows().map(|w| w.name.as_str()).collect();
    info!(?workflows, "rules reloaded");
    Ok(Json(json!({ "reloaded": true, "workflows": workflows })))
}
