// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::Authenticator;
use crate::config::GatewayConfig;
use crate::gateway::ServerEvent;
use crate::room::RoomRegistry;
use crate::store::{MessageGateway, Stores, UserRepository};

/// Shared state handed to every HTTP handler and connection task.
pub struct AppState {
    pub config: GatewayConfig,
    pub auth: Authenticator,
    pub registry: RoomRegistry<ServerEvent>,
    pub messages: MessageGateway,
    pub users: Arc<dyn UserRepository>,
    pub shutdown: CancellationToken,
    connections: AtomicUsize,
}

impl AppState {
    pub fn new(config: GatewayConfig, stores: Stores, shutdown: CancellationToken) -> Self {
        Self {
            auth: Authenticator::new(&config.jwt_secret, config.token_ttl()),
            messages: MessageGateway::new(stores.messages, config.max_content_len),
            users: stores.users,
            registry: RoomRegistry::new(),
            shutdown,
            connections: AtomicUsize::new(0),
            config,
        }
    }

    /// Number of open WebSocket connections.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    pub(crate) fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }
}
