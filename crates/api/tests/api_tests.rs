//! End-to-end tests for the HTTP routes, driven through `tower::ServiceExt`.

use std::sync::Arc;

use api::{router, AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use engine::{DecisionMapper, EventTable, SharedRegistry, WorkflowRegistry};
use http_body_util::BodyExt;
use leave::{InMemoryLeaveRequests, LeaveRequestRepository, LeaveRequestService, ServiceConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const SAMPLE_RULES: &str = include_str!("../../../rules/leave-rules.json");

fn state_with(repo: Arc<InMemoryLeaveRequests>, config: ServiceConfig) -> AppState {
    let registry = WorkflowRegistry::load(SAMPLE_RULES, "leave-rules.json").unwrap();
    AppState::new(LeaveRequestService::new(
        SharedRegistry::new(registry),
        DecisionMapper::new(EventTable::default()),
        repo,
        config,
    ))
}

fn app() -> Router {
    router(state_with(Arc::new(InMemoryLeaveRequests::new()), ServiceConfig::default()))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

#[tokio::test]
async fn health_reports_ok() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn approved_leave_is_200_and_recorded() {
    let repo = Arc::new(InMemoryLeaveRequests::new());
    let app = router(state_with(repo.clone(), ServiceConfig::default()));

    let (status, body) = send(
        app,
        post_json("/approve-leave", json!({ "Id": 11, "Name": "Ravi", "YearsOfService": 2 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approved"], json!(true));
    assert_eq!(body["durationDays"], json!(10));
    assert_eq!(body["message"], json!("Leave Approved for 10 Days"));
    assert_eq!(body["request"]["employeeId"], json!(11));

    let stored = repo.list_for_employee(11).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].duration_days(), 10);
}

#[tokio::test]
async fn rejected_leave_is_400_with_the_decision() {
    let (status, body) = send(
        app(),
        post_json("/approve-leave", json!({ "Id": 12, "YearsOfService": 0.2 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "approved": false, "durationDays": 0, "message": "Leave Not Approved" })
    );
}

#[tokio::test]
async fn misconfigured_workflow_is_500() {
    let config = ServiceConfig {
        rule_set: "Missing".into(),
        ..ServiceConfig::default()
    };
    let app = router(state_with(Arc::new(InMemoryLeaveRequests::new()), config));

    let (status, body) =
        send(app, post_json("/approve-leave", json!({ "Id": 1, "YearsOfService": 2 }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Missing"));
}

#[tokio::test]
async fn evaluate_returns_the_result_tree_and_decision() {
    let (status, body) = send(
        app(),
        post_json(
            "/evaluate/FatherhoodLeaveRule/FatherhoodLeaveRule",
            json!({ "employee": { "YearsOfService": 6, "IsManager": false } }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0]["ruleName"], json!("FatherhoodLeaveOneMonth"));
    assert_eq!(results[0]["isSuccess"], json!(true));
    assert_eq!(results[0]["childResults"].as_array().unwrap().len(), 2);
    assert_eq!(body["decision"]["durationDays"], json!(30));
}

#[tokio::test]
async fn evaluate_unknown_workflow_is_404() {
    let (status, body) =
        send(app(), post_json("/evaluate/Nope/Nope", json!({ "employee": {} }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Nope"));
}

#[tokio::test]
async fn reload_without_a_source_is_500() {
    let (status, _) = send(app(), post_json("/admin/reload", json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn failed_reload_keeps_serving_the_previous_rules() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "{ not json").unwrap();

    let state = state_with(Arc::new(InMemoryLeaveRequests::new()), ServiceConfig::default())
        .with_rules_path(file.path());
    let app = router(state);

    let (status, body) = send(app.clone(), post_json("/admin/reload", json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());

    let (status, body) =
        send(app, post_json("/approve-leave", json!({ "Id": 3, "YearsOfService": 4 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["durationDays"], json!(21));
}

#[tokio::test]
async fn reload_swaps_in_new_rules() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(
        file.path(),
        json!({
            "WorkflowName": "FatherhoodLeaveRule",
            "Rules": [{
                "RuleName": "Everyone",
                "Expression": "true",
                "SuccessEvent": "Fatherhood Leave Approved for 1 Week"
            }]
        })
        .to_string(),
    )
    .unwrap();

    let state = state_with(Arc::new(InMemoryLeaveRequests::new()), ServiceConfig::default())
        .with_rules_path(file.path());
    let app = router(state);

    let (status, body) = send(app.clone(), post_json("/admin/reload", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workflows"], json!(["FatherhoodLeaveRule"]));

    let (status, body) =
        send(app, post_json("/approve-leave", json!({ "Id": 4, "YearsOfService": 0 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["durationDays"], json!(7));
}

#[tokio::test]
async fn reload_dropping_the_configured_workflow_is_refused() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(
        file.path(),
        json!({
            "WorkflowName": "Other",
            "Rules": [{ "RuleName": "Everyone", "Expression": "true" }]
        })
        .to_string(),
    )
    .unwrap();

    let state = state_with(Arc::new(InMemoryLeaveRequests::new()), ServiceConfig::default())
        .with_rules_path(file.path());
    let app = router(state);

    let (status, body) = send(app.clone(), post_json("/admin/reload", json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("FatherhoodLeaveRule"));

    let (status, body) =
        send(app, post_json("/approve-leave", json!({ "Id": 3, "YearsOfService": 4 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["durationDays"], json!(21));
}

#[tokio::test]
async fn unrepresentable_leave_window_is_500() {
    let registry = WorkflowRegistry::load(SAMPLE_RULES, "leave-rules.json").unwrap();
    let table =
        EventTable::default().with("Fatherhood Leave Approved for 10 Days", u32::MAX, "Forever");
    let repo = Arc::new(InMemoryLeaveRequests::new());
    let app = router(AppState::new(LeaveRequestService::new(
        SharedRegistry::new(registry),
        DecisionMapper::new(table),
        repo.clone(),
        ServiceConfig::default(),
    )));

    let (status, body) =
        send(app, post_json("/approve-leave", json!({ "Id": 3, "YearsOfService": 2 }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("date range"));
    assert!(repo.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_bodies_get_a_json_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/approve-leave")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) =
        send(app(), post_json("/approve-leave", json!({ "Name": "No Years" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (status, body) = send(
        app(),
        post_json(
            "/evaluate/FatherhoodLeaveRule/FatherhoodLeaveRule",
            json!(["not", "an", "object"]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}
