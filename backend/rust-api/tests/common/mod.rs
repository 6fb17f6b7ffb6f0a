#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

use adaptive_tutor_api::{
    config::Config,
    create_router,
    services::{adaptive::AdaptiveCoordinator, AppState},
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Router with no learned model: every decision comes from the threshold rule.
pub fn create_test_app() -> Router {
    init_tracing();
    let config = Config {
        learned_enabled: false,
        ..Config::default()
    };
    create_router(Arc::new(AppState::new(config)))
}

/// Rule-only router that drops sessions idle for more than `ttl_secs`.
pub fn create_test_app_with_session_ttl(ttl_secs: u64) -> Router {
    init_tracing();
    let config = Config {
        learned_enabled: false,
        session_ttl_secs: ttl_secs,
        ..Config::default()
    };
    create_router(Arc::new(AppState::new(config)))
}

/// Router whose learned model is read from `dir`.
pub fn create_test_app_with_model(dir: &Path) -> Router {
    init_tracing();
    let config = Config {
        model_path: dir.join("adaptive_tree.json"),
        model_meta_path: dir.join("adaptive_meta.json"),
        learned_enabled: true,
        ..Config::default()
    };
    create_router(Arc::new(AppState::new(config)))
}

pub fn create_test_app_with_coordinator(coordinator: AdaptiveCoordinator) -> Router {
    init_tracing();
    create_router(Arc::new(AppState::with_coordinator(
        Config::default(),
        coordinator,
    )))
}

/// Tree that demotes at window accuracy <= 0.5, then promotes when the mean
/// response time is at most 10s and holds otherwise.
pub fn write_model_artifacts(dir: &Path) {
    let tree = json!({
        "n_features": 4,
        "classes": [-1, 0, 1],
        "children_left": [1, -1, 3, -1, -1],
        "children_right": [2, -1, 4, -1, -1],
        "feature": [0, -2, 1, -2, -2],
        "threshold": [0.5, -2.0, 10.0, -2.0, -2.0],
        "value": [[10.0, 10.0, 10.0], [9.0, 1.0, 0.0], [1.0, 9.0, 10.0], [0.0, 1.0, 9.0], [1.0, 8.0, 1.0]],
        "feature_importances": [0.6, 0.4, 0.0, 0.0]
    });
    let meta = json!({
        "model": "DecisionTreeClassifier",
        "window_size": 3,
        "features": ["window_acc", "avg_rt", "streak", "level_code"]
    });
    std::fs::write(dir.join("adaptive_tree.json"), tree.to_string()).unwrap();
    std::fs::write(dir.join("adaptive_meta.json"), meta.to_string()).unwrap();
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

pub async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    let json = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        panic!(
            "non-JSON body with status {}: {}",
            status,
            String::from_utf8_lossy(&bytes)
        )
    });
    (status, json)
}

/// Creates a session and returns its id and first question.
pub async fn create_session(app: &Router, body: Value) -> (String, String) {
    let (status, json) = send_json(app, "POST", "/api/v1/sessions", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", json);
    (
        json["session_id"].as_str().unwrap().to_string(),
        json["puzzle"]["question"].as_str().unwrap().to_string(),
    )
}

/// Solves a question of the form `a <op> b = ?`.
pub fn solve(question: &str) -> String {
    let parts: Vec<&str> = question.split_whitespace().collect();
    let a: i64 = parts[0].parse().unwrap();
    let b: i64 = parts[2].parse().unwrap();
    match parts[1] {
        "+" => (a + b).to_string(),
        "-" => (a - b).to_string(),
        "*" => (a * b).to_string(),
        "/" => {
            let quotient = a as f64 / b as f64;
            format!("{}", (quotient * 100.0).round() / 100.0)
        }
        op => panic!("unknown operator {}", op),
    }
}
