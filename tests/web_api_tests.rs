//! Integration tests for the web API.
//!
//! These tests verify the HTTP API endpoints work correctly.

#![cfg(feature = "web")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use cp_interlock::config::InputBindings;
use cp_interlock::hal::{MockIo, MockLatch};
use cp_interlock::services::{
    build_router, ApiResponse, CommandResponse, SharedControlPoint, StateResponse, StatusResponse,
    WebServerConfig,
};
use cp_interlock::{
    CommandOutcome, CommandSource, ControlPoint, ControlPointConfig, RejectReason, Route, TickEvents,
    TimelockState, TurnoutId, COMMAND_QUEUE_LEN,
};

fn create_test_app() -> (axum::Router, Arc<SharedControlPoint<MockLatch>>) {
    let cp = ControlPoint::new(ControlPointConfig::default(), &InputBindings::default(), MockLatch::new());
    let state = Arc::new(SharedControlPoint::new(cp));
    let config = WebServerConfig::default();
    let router = build_router(Arc::clone(&state), &config);
    (router, state)
}

fn run_cycle(state: &SharedControlPoint<MockLatch>) {
    let io = MockIo::field_at_rest();
    state
        .with_control_point(|cp| cp.cycle(&io, TickEvents::idle()))
        .unwrap();
}

async fn get_json<T: serde::de::DeserializeOwned>(app: axum::Router, uri: &str) -> (StatusCode, T) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: axum::Router, uri: &str, body: &str) -> ApiResponse<CommandResponse> {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_get_state() {
    let (app, _state) = create_test_app();

    let (status, json): (_, ApiResponse<StateResponse>) = get_json(app, "/api/state").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.success);

    let data = json.data.unwrap();
    assert_eq!(data.timelock, TimelockState::Locked);
    assert!(data.routes.is_empty());
    assert!(data.turnouts.iter().all(|t| t.actual_normal && !t.locked));
    assert_eq!(data.pending_commands, 0);
    assert!(data.last_outcome.is_none());
}

#[tokio::test]
async fn test_get_status() {
    let (app, state) = create_test_app();
    run_cycle(&state);

    let (status, json): (_, ApiResponse<StatusResponse>) = get_json(app, "/api/status").await;
    assert_eq!(status, StatusCode::OK);

    let data = json.data.unwrap();
    assert_eq!(data.bytes, data.status.to_bytes());
    assert!(data.status.east_crossover.normal);
    assert!(!data.status.main1_occupied);
}

#[tokio::test]
async fn test_code_route_is_queued() {
    let (app, state) = create_test_app();

    let json = post_json(app, "/api/route", r#"{"entrance": "main1_eastbound", "set": true}"#).await;
    assert!(json.success);
    let data = json.data.unwrap();
    assert!(data.accepted);
    assert_eq!(data.result, "queued");

    // Nothing changes until the control loop runs.
    assert!(!state.status().main1_west_cleared);
    run_cycle(&state);
    assert!(state.status().main1_west_cleared);

    let routes = state.with_control_point(|cp| cp.state().routes().iter().collect::<Vec<_>>());
    assert_eq!(routes, vec![Route::Main1Eastbound]);
}

#[tokio::test]
async fn test_set_turnout_outcome_in_state() {
    let (app, state) = create_test_app();

    let json = post_json(app.clone(), "/api/turnout", r#"{"turnout": "west_crossover", "normal": false}"#).await;
    assert!(json.data.unwrap().accepted);
    run_cycle(&state);

    let (_, json): (_, ApiResponse<StateResponse>) = get_json(app, "/api/state").await;
    let data = json.data.unwrap();
    let west = data
        .turnouts
        .iter()
        .find(|t| t.id == TurnoutId::WestCrossover)
        .unwrap();
    assert!(!west.requested_normal);
    assert!(west.actual_normal);

    let last = data.last_outcome.unwrap();
    assert_eq!(last.source, CommandSource::WebApi);
    assert_eq!(last.outcome, CommandOutcome::Applied);
}

#[tokio::test]
async fn test_rejected_route_reported_after_cycle() {
    let (app, state) = create_test_app();

    post_json(app.clone(), "/api/route", r#"{"entrance": "main2_westbound"}"#).await;
    post_json(app.clone(), "/api/route", r#"{"entrance": "main2_eastbound"}"#).await;
    run_cycle(&state);

    let (_, json): (_, ApiResponse<StateResponse>) = get_json(app, "/api/state").await;
    let last = json.data.unwrap().last_outcome.unwrap();
    assert_eq!(last.outcome, CommandOutcome::Rejected(RejectReason::ConflictingRoute));
}

#[tokio::test]
async fn test_invalid_requests() {
    let (app, state) = create_test_app();

    let json = post_json(app.clone(), "/api/route", r#"{"entrance": "main9_eastbound"}"#).await;
    assert!(!json.success);
    assert!(json.error.is_some());

    let json = post_json(app, "/api/turnout", "not json").await;
    assert!(!json.success);

    assert_eq!(state.with_control_point(|cp| cp.pending_commands()), 0);
}

#[tokio::test]
async fn test_queue_full() {
    let (app, _state) = create_test_app();
    let body = r#"{"entrance": "main3_eastbound"}"#;

    for _ in 0..COMMAND_QUEUE_LEN {
        let json = post_json(app.clone(), "/api/route", body).await;
        assert!(json.data.unwrap().accepted);
    }

    let json = post_json(app, "/api/route", body).await;
    assert!(json.success);
    let data = json.data.unwrap();
    assert!(!data.accepted);
    assert_eq!(data.result, "queue_full");
}

#[tokio::test]
async fn test_not_found() {
    let (app, _state) = create_test_app();

    let (status, json): (_, ApiResponse<()>) = get_json(app, "/api/nonexistent").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!json.success);
}
