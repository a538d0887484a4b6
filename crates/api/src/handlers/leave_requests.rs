use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use leave::{Employee, LeaveOutcome};

use super::AppState;
use crate::ApiError;

/// `POST /approve-leave`: 200 when approved, 400 with the same body when not.
pub async fn approve(
    State(state): State<AppState>,
    payload: Result<Json<Employee>, JsonRejection>,
) -> Result<(StatusCode, Json<LeaveOutcome>), ApiError> {
    let Json(employee) = payload?;
    let outcome = state.service.approve(&employee).await?;
    let status = if outcome.decision.approved {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(outcome)))
}
