// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection state machine.
//!
//! A [`Session`] starts `Unauthenticated`, becomes `Idle` once the handshake
//! credential checks out, moves between `Idle` and `InRoom` as the client
//! joins and leaves, and ends `Closed`. Every room operation needs an
//! identity; until one is attached, events are refused without touching the
//! registry or the store.

use tokio::sync::mpsc;

use crate::auth::{Authenticator, Identity};
use crate::dm;
use crate::error::{ErrorCode, GatewayError};
use crate::gateway::event::{format_time, now, ClientEvent, HistoryEntry, ServerEvent};
use crate::room::ConnectionId;
use crate::state::AppState;

/// Longest accepted room key, in characters.
pub const MAX_ROOM_KEY_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Unauthenticated,
    Idle,
    InRoom(String),
    Closed,
}

/// Dispatcher state for one connection.
pub struct Session {
    conn: ConnectionId,
    identity: Option<Identity>,
    phase: Phase,
    outbox: mpsc::Sender<ServerEvent>,
}

impl Session {
    /// A fresh, unauthenticated session whose events are delivered to `outbox`.
    pub fn new(outbox: mpsc::Sender<ServerEvent>) -> Self {
        Self { conn: ConnectionId::next(), identity: None, phase: Phase::Unauthenticated, outbox }
    }

    pub fn conn(&self) -> ConnectionId {
        self.conn
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn current_room(&self) -> Option<&str> {
        match &self.phase {
            Phase::InRoom(room) => Some(room),
            _ => None,
        }
    }

    /// Attach the identity carried by `credential`. A missing or bad
    /// credential closes the session.
    pub fn authenticate(
        &mut self,
        auth: &Authenticator,
        credential: Option<&str>,
    ) -> Result<&Identity, GatewayError> {
        if self.phase != Phase::Unauthenticated {
            return Err(GatewayError::unauthorized("session already authenticated or closed"));
        }
        let result = credential
            .ok_or_else(|| GatewayError::unauthorized("missing credential"))
            .and_then(|token| auth.authenticate(token));
        match result {
            Ok(identity) => {
                self.phase = Phase::Idle;
                Ok(self.identity.insert(identity))
            }
            Err(e) => {
                tracing::debug!(conn = %self.conn, err = %e, "handshake rejected");
                self.phase = Phase::Closed;
                Err(e)
            }
        }
    }

    /// Handle one event and deliver any reply or error to this connection.
    ///
    /// Returns `false` when the connection should be dropped.
    pub async fn dispatch(&mut self, state: &AppState, event: ClientEvent) -> bool {
        let kind = event.kind();
        match self.handle(state, event).await {
            Ok(Some(reply)) => self.reply(reply).await,
            Ok(None) => true,
            Err(e) if e.code == ErrorCode::Unauthorized => {
                tracing::debug!(conn = %self.conn, kind, "event on unauthenticated connection");
                false
            }
            Err(e) => {
                tracing::debug!(conn = %self.conn, kind, err = %e, "event rejected");
                self.reply(ServerEvent::error(&e)).await
            }
        }
    }

    /// Apply one client event. `Ok(Some(_))` is a reply for this connection only.
    pub async fn handle(
        &mut self,
        state: &AppState,
        event: ClientEvent,
    ) -> Result<Option<ServerEvent>, GatewayError> {
        let identity = self.require_identity()?;
        match event {
            ClientEvent::Join { room } => {
                self.join(state, &identity, room)?;
                Ok(None)
            }
            ClientEvent::Leave { room } => {
                self.leave(state, &identity, &room)?;
                Ok(None)
            }
            ClientEvent::Message { room, content, to_username } => {
                self.send(state, &identity, &room, &content, to_username.as_deref()).await?;
                Ok(None)
            }
            ClientEvent::History { room } => self.history(state, &identity, room).await.map(Some),
            ClientEvent::Typing { room } => {
                self.typing(state, &identity, &room);
                Ok(None)
            }
            ClientEvent::OpenDm { username } => {
                self.open_dm(state, &identity, &username).await.map(Some)
            }
            ClientEvent::Ping {} => Ok(Some(ServerEvent::Pong {})),
        }
    }

    /// Queue `event` for this connection. Returns `false` if the writer is gone.
    pub async fn reply(&self, event: ServerEvent) -> bool {
        self.outbox.send(event).await.is_ok()
    }

    /// Release room membership and end the session. Idempotent.
    ///
    /// No "left" announcement is made for a dropped connection.
    pub fn close(&mut self, state: &AppState) {
        if let Phase::InRoom(room) = &self.phase {
            state.registry.leave(room, self.conn);
            tracing::debug!(conn = %self.conn, room = %room, "released membership on close");
        }
        self.phase = Phase::Closed;
    }

    fn require_identity(&self) -> Result<Identity, GatewayError> {
        match (&self.phase, &self.identity) {
            (Phase::Idle | Phase::InRoom(_), Some(identity)) => Ok(identity.clone()),
            _ => Err(GatewayError::unauthorized("not authenticated")),
        }
    }

    /// Joining the current room again re-announces the member.
    fn join(
        &mut self,
        state: &AppState,
        identity: &Identity,
        room: String,
    ) -> Result<(), GatewayError> {
        check_room_key(&room)?;
        let previous = self.current_room().filter(|current| *current != room).map(str::to_owned);
        if let Some(previous) = previous {
            state.registry.leave(&previous, self.conn);
            state.registry.broadcast(
                &previous,
                ServerEvent::system(format!("{} left {previous}", identity.username)),
            );
        }
        state.registry.join(&room, self.conn, self.outbox.clone());
        tracing::info!(conn = %self.conn, user = %identity.username, room = %room, "joined room");
        state
            .registry
            .broadcast(&room, ServerEvent::system(format!("{} joined {room}", identity.username)));
        self.phase = Phase::InRoom(room);
        Ok(())
    }

    fn leave(
        &mut self,
        state: &AppState,
        identity: &Identity,
        room: &str,
    ) -> Result<(), GatewayError> {
        if self.current_room() != Some(room) {
            return Err(GatewayError::validation(format!("not in room {room}")));
        }
        state.registry.leave(room, self.conn);
        tracing::info!(conn = %self.conn, user = %identity.username, room, "left room");
        state
            .registry
            .broadcast(room, ServerEvent::system(format!("{} left {room}", identity.username)));
        self.phase = Phase::Idle;
        Ok(())
    }

    async fn send(
        &self,
        state: &AppState,
        identity: &Identity,
        room: &str,
        content: &str,
        to_username: Option<&str>,
    ) -> Result<(), GatewayError> {
        check_room_key(room)?;
        if self.current_room() != Some(room) {
            return Err(GatewayError::validation(format!("not in room {room}")));
        }
        let recipient_id = match to_username.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) if identity.is_named(name) => {
                return Err(GatewayError::validation("cannot send a direct message to yourself"));
            }
            Some(name) => resolve_recipient(state, name).await,
            None => None,
        };

        let message = state.messages.persist(room, identity, recipient_id, content).await?;
        let delivered = state.registry.broadcast(
            room,
            ServerEvent::Message {
                room: message.room,
                author: identity.username.clone(),
                content: message.content,
                time: format_time(message.created_at),
            },
        );
        tracing::debug!(conn = %self.conn, room, delivered, "message broadcast");
        Ok(())
    }

    async fn history(
        &self,
        state: &AppState,
        identity: &Identity,
        room: String,
    ) -> Result<ServerEvent, GatewayError> {
        check_room_key(&room)?;
        let messages = state
            .messages
            .recent_history(&room, state.config.history_limit)
            .await?
            .into_iter()
            .map(|entry| HistoryEntry::from_authored(entry, &identity.id))
            .collect();
        Ok(ServerEvent::History { room, messages })
    }

    /// Typing outside the current room is dropped without reply.
    fn typing(&self, state: &AppState, identity: &Identity, room: &str) {
        if room.is_empty() || self.current_room() != Some(room) {
            return;
        }
        state.registry.broadcast_excluding(
            room,
            ServerEvent::Typing { author: identity.username.clone(), time: now() },
            self.conn,
        );
    }

    async fn open_dm(
        &mut self,
        state: &AppState,
        identity: &Identity,
        username: &str,
    ) -> Result<ServerEvent, GatewayError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(GatewayError::validation("username is required"));
        }
        if identity.is_named(username) {
            return Err(GatewayError::validation("cannot open a direct message with yourself"));
        }
        let target = state
            .users
            .find_by_username(username)
            .await
            .map_err(|e| {
                tracing::warn!("user lookup failed: {e:#}");
                GatewayError::storage("failed to look up user")
            })?
            .ok_or_else(|| GatewayError::not_found(format!("user {username} not found")))?;

        let room = dm::derive_room_key(&identity.username, &target.username);
        self.join(state, identity, room.clone())?;
        Ok(ServerEvent::DmOpened { room, with: target.username })
    }
}

/// Best-effort lookup of a DM recipient. Unknown names are logged and dropped.
async fn resolve_recipient(state: &AppState, username: &str) -> Option<String> {
    match state.users.find_by_username(username).await {
        Ok(Some(user)) => Some(user.id),
        Ok(None) => {
            tracing::debug!(to = username, "recipient not found, storing without recipient");
            None
        }
        Err(e) => {
            tracing::warn!(to = username, "recipient lookup failed: {e:#}");
            None
        }
    }
}

fn check_room_key(room: &str) -> Result<(), GatewayError> {
    if room.trim().is_empty() {
        return Err(GatewayError::validation("room is required"));
    }
    if room.chars().count() > MAX_ROOM_KEY_LEN {
        return Err(GatewayError::validation(format!(
            "room must be at most {MAX_ROOM_KEY_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
