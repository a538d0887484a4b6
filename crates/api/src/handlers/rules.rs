use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use engine::{Decision, FactBindings, RuleResult};
use serde::Serialize;

use super::AppState;
use crate::ApiError;

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub results: Vec<RuleResult>,
    pub decision: Decision,
}

/// `POST /evaluate/:workflow/:rule_set`: run any loaded rule set against the
/// posted bindings without recording anything.
pub async fn evaluate(
    Path((workflow, rule_set)): Path<(String, String)>,
    State(state): State<AppState>,
    payload: Result<Json<FactBindings>, JsonRejection>,
) -> Result<Json<EvaluationResponse>, ApiError> {
    let Json(facts) = payload?;
    let results = state
        .service
        .executor()
        .execute_all(&workflow, &rule_set, &facts)
        .map_err(ApiError::from_lookup)?;
    let decision = state.service.mapper().map(&results);
    Ok(Json(EvaluationResponse { results, decision }))
}
