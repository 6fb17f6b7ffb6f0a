use axum::http::StatusCode;
use serde_json::json;

mod common;

use common::{
    create_session, create_test_app, create_test_app_with_session_ttl, send, send_json, solve,
};

#[tokio::test]
async fn test_create_session_returns_first_puzzle() {
    let app = create_test_app();

    let (status, json) = send_json(
        &app,
        "POST",
        "/api/v1/sessions",
        Some(json!({ "user_name": "alice", "rounds": 5 })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["current_level"], "easy");
    assert_eq!(json["rounds_left"], 5);
    assert_eq!(json["window_size"], 3);
    assert_eq!(json["use_learned"], false);
    assert_eq!(json["puzzle"]["level"], "easy");
    assert!(json["puzzle"]["question"].as_str().unwrap().ends_with("= ?"));
    // The answer never leaves the server before the learner replies.
    assert!(json["puzzle"].get("answer").is_none());
}

#[tokio::test]
async fn test_create_session_validation() {
    let app = create_test_app();

    for body in [
        json!({ "user_name": "" }),
        json!({ "user_name": "bob", "window_size": 9 }),
        json!({ "user_name": "bob", "rounds": 1 }),
    ] {
        let (status, json) = send_json(&app, "POST", "/api/v1/sessions", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], 400);
    }

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/sessions",
        Some(json!({ "user_name": "bob", "initial_level": "expert" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_correct_fast_answer_promotes() {
    let app = create_test_app();
    let (id, question) = create_session(&app, json!({ "user_name": "carol" })).await;

    let (status, json) = send_json(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/answers", id),
        Some(json!({ "answer": solve(&question), "response_time_seconds": 5.0 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["correct"], true);
    assert_eq!(json["previous_level"], "easy");
    assert_eq!(json["next_level"], "medium");
    assert_eq!(json["decision"]["source"], "rule");
    assert_eq!(
        json["decision"]["rationale"],
        "Promote (rule): acc=1.00, time=5.0s"
    );
    assert_eq!(json["next_puzzle"]["level"], "medium");
}

#[tokio::test]
async fn test_wrong_answers_demote_from_medium() {
    let app = create_test_app();
    let (id, _) = create_session(
        &app,
        json!({ "user_name": "dave", "initial_level": "medium" }),
    )
    .await;

    let mut last = serde_json::Value::Null;
    for rt in [20.0, 25.0, 22.0] {
        let (status, json) = send_json(
            &app,
            "POST",
            &format!("/api/v1/sessions/{}/answers", id),
            Some(json!({ "answer": "not a number", "response_time_seconds": rt })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["correct"], false);
        last = json;
    }

    // The first wrong answer already demotes, later ones clamp at easy.
    assert_eq!(last["next_level"], "easy");
    assert_eq!(last["decision"]["action"], "demote");

    let (_, session) = send_json(&app, "GET", &format!("/api/v1/sessions/{}", id), None).await;
    assert_eq!(session["num_attempts"], 3);
    assert_eq!(session["accuracy"], 0.0);
    assert_eq!(session["current_level"], "easy");
    assert_eq!(session["level_counts"]["medium"], 1);
    assert_eq!(session["level_counts"]["easy"], 2);
    assert_eq!(session["level_counts"]["hard"], 0);
}

#[tokio::test]
async fn test_puzzle_endpoint_returns_pending_puzzle() {
    let app = create_test_app();
    let (id, question) = create_session(&app, json!({ "user_name": "erin" })).await;

    let (status, json) =
        send_json(&app, "GET", &format!("/api/v1/sessions/{}/puzzle", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["question"], question);
}

#[tokio::test]
async fn test_rounds_run_out_and_session_completes() {
    let app = create_test_app();
    let (id, _) = create_session(&app, json!({ "user_name": "frank", "rounds": 3 })).await;
    let answers = format!("/api/v1/sessions/{}/answers", id);

    for expected_left in [2, 1, 0] {
        let (status, json) = send_json(
            &app,
            "POST",
            &answers,
            Some(json!({ "answer": "0", "response_time_seconds": 3.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["rounds_left"], expected_left);
    }

    let (status, _) = send(
        &app,
        "POST",
        &answers,
        Some(json!({ "answer": "0", "response_time_seconds": 3.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, summary) =
        send_json(&app, "GET", &format!("/api/v1/sessions/{}/summary", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["user"], "frank");
    assert_eq!(summary["num_attempts"], 3);
    assert!(summary["ended_at"].is_string());
    assert_eq!(summary["attempts"].as_array().unwrap().len(), 3);
    assert_eq!(summary["attempts"][0]["ordinal"], 1);
}

#[tokio::test]
async fn test_complete_session_is_idempotent() {
    let app = create_test_app();
    let (id, _) = create_session(&app, json!({ "user_name": "grace" })).await;
    let uri = format!("/api/v1/sessions/{}/complete", id);

    let (status, first) = send_json(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = send_json(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["ended_at"], second["ended_at"]);

    let (status, _) = send(&app, "GET", &format!("/api/v1/sessions/{}/puzzle", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, session) = send_json(&app, "GET", &format!("/api/v1/sessions/{}", id), None).await;
    assert_eq!(session["status"], "completed");
}

#[tokio::test]
async fn test_unknown_session_returns_404() {
    let app = create_test_app();
    let missing = "550e8400-e29b-41d4-a716-446655440000";

    for (method, path) in [
        ("GET", ""),
        ("GET", "/puzzle"),
        ("GET", "/summary"),
        ("GET", "/export.csv"),
        ("POST", "/complete"),
    ] {
        let (status, _) = send(
            &app,
            method,
            &format!("/api/v1/sessions/{}{}", missing, path),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, path);
    }

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/answers", missing),
        Some(json!({ "answer": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_negative_response_time_rejected() {
    let app = create_test_app();
    let (id, _) = create_session(&app, json!({ "user_name": "heidi" })).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/answers", id),
        Some(json!({ "answer": "1", "response_time_seconds": -1.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The rejected request did not consume the pending puzzle.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/answers", id),
        Some(json!({ "answer": "1", "response_time_seconds": 1.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_idle_session_expires() {
    let app = create_test_app_with_session_ttl(1);
    let (id, _) = create_session(&app, json!({ "user_name": "ivy" })).await;

    let (status, _) = send(&app, "GET", &format!("/api/v1/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(std::time::Duration::from_millis(1300)).await;

    for path in ["", "/summary", "/export.csv"] {
        let (status, _) = send(
            &app,
            "GET",
            &format!("/api/v1/sessions/{}{}", id, path),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "GET {}", path);
    }

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/answers", id),
        Some(json!({ "answer": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Creating a session sweeps the expired one out of the store.
    create_session(&app, json!({ "user_name": "jack" })).await;
    let (_, health) = send_json(&app, "GET", "/health", None).await;
    assert_eq!(health["sessions"], 1);
}
