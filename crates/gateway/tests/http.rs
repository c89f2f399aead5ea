// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP endpoint tests: health, signup, login, and the WebSocket gate.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;

use parley::state::AppState;
use parley::test_support::{AnyhowExt, AppStateBuilder};
use parley::transport::build_router;
use parley::transport::http::{HealthResponse, TokenResponse};

fn server() -> anyhow::Result<(TestServer, Arc<AppState>)> {
    let state = AppStateBuilder::new().build();
    let server = TestServer::new(build_router(state.clone())).anyhow()?;
    Ok((server, state))
}

fn error_message(body: &serde_json::Value) -> Option<&str> {
    body.get("error").and_then(|e| e.get("message")).and_then(|m| m.as_str())
}

#[tokio::test]
async fn health_reports_running() -> anyhow::Result<()> {
    let (server, _) = server()?;
    let resp = server.get("/health").await;
    resp.assert_status(StatusCode::OK);
    let body: HealthResponse = resp.json();
    assert_eq!(body.status, "running");
    assert_eq!(body.connections, 0);
    assert_eq!(body.rooms, 0);
    Ok(())
}

#[tokio::test]
async fn signup_issues_a_usable_token() -> anyhow::Result<()> {
    let (server, state) = server()?;
    let resp =
        server.post("/auth/signup").json(&json!({"username": "  Alice ", "password": "pw"})).await;
    resp.assert_status(StatusCode::OK);
    let body: TokenResponse = resp.json();

    let identity = state.auth.authenticate(&body.access_token).anyhow()?;
    assert_eq!(identity.username, "Alice");
    assert_eq!(identity.role.as_str(), "user");
    Ok(())
}

#[tokio::test]
async fn signup_rejects_duplicate_username() -> anyhow::Result<()> {
    let (server, _) = server()?;
    server
        .post("/auth/signup")
        .json(&json!({"username": "alice", "password": "pw"}))
        .await
        .assert_status(StatusCode::OK);

    let resp =
        server.post("/auth/signup").json(&json!({"username": "ALICE", "password": "x"})).await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(error_message(&body), Some("Username already in use"));
    Ok(())
}

#[tokio::test]
async fn signup_rejects_invalid_input() -> anyhow::Result<()> {
    let (server, _) = server()?;
    let cases = [("", "pw"), ("   ", "pw"), ("alice", ""), ("a:b", "pw")];
    for (username, password) in cases {
        let resp = server
            .post("/auth/signup")
            .json(&json!({"username": username, "password": password}))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

#[tokio::test]
async fn login_checks_the_password() -> anyhow::Result<()> {
    let (server, state) = server()?;
    server
        .post("/auth/signup")
        .json(&json!({"username": "alice", "password": "correct horse"}))
        .await
        .assert_status(StatusCode::OK);

    let resp = server
        .post("/auth/login")
        .json(&json!({"username": "Alice", "password": "correct horse"}))
        .await;
    resp.assert_status(StatusCode::OK);
    let body: TokenResponse = resp.json();
    assert_eq!(state.auth.authenticate(&body.access_token).anyhow()?.username, "alice");

    for (username, password) in [("alice", "wrong"), ("nobody", "correct horse"), ("", "")] {
        let resp = server
            .post("/auth/login")
            .json(&json!({"username": username, "password": password}))
            .await;
        resp.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = resp.json();
        assert_eq!(error_message(&body), Some("Invalid credentials"));
    }
    Ok(())
}

#[tokio::test]
async fn websocket_without_credential_is_refused() -> anyhow::Result<()> {
    let (server, _) = server()?;
    let resp = server.get("/ws").await;
    resp.assert_status(StatusCode::UNAUTHORIZED);

    let resp = server.get("/ws").add_query_param("token", "garbage").await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}
