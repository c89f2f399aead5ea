// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: state builder, connected sessions, helpers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::auth::{Identity, Role};
use crate::config::GatewayConfig;
use crate::gateway::{ClientEvent, ServerEvent, Session};
use crate::state::AppState;
use crate::store::{Stores, User};

pub const TEST_SECRET: &str = "test-secret-do-not-use";

pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
        jwt_secret: TEST_SECRET.to_owned(),
        token_ttl_secs: 3600,
        database_url: None,
        history_limit: 50,
        outbox_capacity: 64,
        max_content_len: 4000,
        cors_origin: None,
    }
}

/// Builder for constructing `AppState` in tests with sensible defaults.
pub struct AppStateBuilder {
    config: GatewayConfig,
    stores: Option<Stores>,
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self { config: test_config(), stores: None }
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = limit;
        self
    }

    pub fn outbox_capacity(mut self, capacity: usize) -> Self {
        self.config.outbox_capacity = capacity;
        self
    }

    pub fn stores(mut self, stores: Stores) -> Self {
        self.stores = Some(stores);
        self
    }

    pub fn build(self) -> Arc<AppState> {
        let stores = self.stores.unwrap_or_else(Stores::memory);
        Arc::new(AppState::new(self.config, stores, CancellationToken::new()))
    }
}

/// Create `username` directly in the store and mint a token for it.
///
/// Skips password hashing; use the HTTP endpoints when the hash matters.
pub async fn register(state: &AppState, username: &str) -> anyhow::Result<(Identity, String)> {
    let user = User::new(username, "unused", Role::User);
    if !state.users.create(&user).await? {
        anyhow::bail!("username {username} already registered");
    }
    let identity = user.identity();
    let token = state.auth.issue(&identity).anyhow()?;
    Ok((identity, token))
}

/// An authenticated session paired with the receiving end of its outbox.
pub struct TestClient {
    pub session: Session,
    pub rx: mpsc::Receiver<ServerEvent>,
}

impl TestClient {
    /// Register `username` and run the handshake with its token.
    pub async fn connect(state: &AppState, username: &str) -> anyhow::Result<Self> {
        let (_, token) = register(state, username).await?;
        let (tx, rx) = mpsc::channel(state.config.outbox_capacity);
        let mut session = Session::new(tx);
        session.authenticate(&state.auth, Some(&token)).anyhow()?;
        Ok(Self { session, rx })
    }

    pub async fn send(&mut self, state: &AppState, event: ClientEvent) -> bool {
        self.session.dispatch(state, event).await
    }

    pub async fn join(&mut self, state: &AppState, room: &str) -> bool {
        self.send(state, ClientEvent::Join { room: room.to_owned() }).await
    }

    pub async fn say(&mut self, state: &AppState, room: &str, content: &str) -> bool {
        let event = ClientEvent::Message {
            room: room.to_owned(),
            content: content.to_owned(),
            to_username: None,
        };
        self.send(state, event).await
    }

    /// Everything queued for this client so far.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Spawn the HTTP + WebSocket server on a random port for integration testing.
///
/// Returns the bound address and a join handle for the server task.
pub async fn spawn_http_server(
    state: Arc<AppState>,
) -> anyhow::Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = crate::serve(listener, state).await;
    });
    Ok((addr, handle))
}

pub trait AnyhowExt<T> {
    fn anyhow(self) -> anyhow::Result<T>;
}

impl<T, E: std::fmt::Display> AnyhowExt<T> for Result<T, E> {
    fn anyhow(self) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{e}"))
    }
}
