// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers: health and credential issuance.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{validate_username, Role};
use crate::error::GatewayError;
use crate::state::AppState;
use crate::store::User;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub connections: usize,
    pub rooms: usize,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "running".to_owned(),
        connections: state.connection_count(),
        rooms: state.registry.room_count(),
    })
}

/// `POST /auth/signup`
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<TokenResponse>, GatewayError> {
    let username = req.username.trim().to_owned();
    validate_username(&username)?;
    if req.password.is_empty() {
        return Err(GatewayError::validation("password is required"));
    }
    if find_user(&state, &username).await?.is_some() {
        return Err(GatewayError::validation("Username already in use"));
    }

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| GatewayError::internal(format!("hashing task failed: {e}")))?
        .map_err(|e| GatewayError::internal(format!("password hashing failed: {e:#}")))?;

    let user = User::new(username, password_hash, Role::User);
    let created = state.users.create(&user).await.map_err(|e| {
        tracing::warn!(user = %user.username, "failed to create user: {e:#}");
        GatewayError::storage("failed to create user")
    })?;
    if !created {
        return Err(GatewayError::validation("Username already in use"));
    }

    tracing::info!(user = %user.username, id = %user.id, "user signed up");
    let access_token = state.auth.issue(&user.identity())?;
    Ok(Json(TokenResponse { access_token }))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<TokenResponse>, GatewayError> {
    let invalid = || GatewayError::unauthorized("Invalid credentials");
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(invalid());
    }
    let user = find_user(&state, username).await?.ok_or_else(invalid)?;

    let stored = user.password_hash.clone();
    let password = req.password;
    let verified = tokio::task::spawn_blocking(move || verify_password(&stored, &password))
        .await
        .map_err(|e| GatewayError::internal(format!("verification task failed: {e}")))?;
    if !verified {
        tracing::debug!(user = %user.username, "login rejected");
        return Err(invalid());
    }

    tracing::debug!(user = %user.username, "user logged in");
    let access_token = state.auth.issue(&user.identity())?;
    Ok(Json(TokenResponse { access_token }))
}

async fn find_user(state: &AppState, username: &str) -> Result<Option<User>, GatewayError> {
    state.users.find_by_username(username).await.map_err(|e| {
        tracing::warn!(user = username, "user lookup failed: {e:#}");
        GatewayError::storage("failed to look up user")
    })
}
