// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use chrono::Utc;

use crate::auth::Identity;
use crate::error::GatewayError;
use crate::store::{AuthoredMessage, Message, MessageRepository};

/// Validating front for the message log.
///
/// The only path by which messages are created. Content is checked before
/// anything touches storage, and history is handed back oldest first.
#[derive(Clone)]
pub struct MessageGateway {
    repo: Arc<dyn MessageRepository>,
    max_content_len: usize,
}

impl MessageGateway {
    pub fn new(repo: Arc<dyn MessageRepository>, max_content_len: usize) -> Self {
        Self { repo, max_content_len }
    }

    /// Validate and store a message from `sender`, returning the stored record.
    pub async fn persist(
        &self,
        room: &str,
        sender: &Identity,
        recipient_id: Option<String>,
        content: &str,
    ) -> Result<Message, GatewayError> {
        self.validate(content)?;
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            room: room.to_owned(),
            sender_id: sender.id.clone(),
            recipient_id,
            content: content.to_owned(),
            created_at: Utc::now(),
        };
        if let Err(e) = self.repo.insert(&message).await {
            tracing::warn!(room, user = %sender.username, "persist failed: {e:#}");
            return Err(GatewayError::storage("failed to store message"));
        }
        Ok(message)
    }

    /// Up to `limit` most recent messages in `room`, oldest first.
    pub async fn recent_history(
        &self,
        room: &str,
        limit: usize,
    ) -> Result<Vec<AuthoredMessage>, GatewayError> {
        let mut messages = self.repo.recent(room, limit).await.map_err(|e| {
            tracing::warn!(room, "history lookup failed: {e:#}");
            GatewayError::storage("failed to load history")
        })?;
        messages.reverse();
        Ok(messages)
    }

    fn validate(&self, content: &str) -> Result<(), GatewayError> {
        if content.trim().is_empty() {
            return Err(GatewayError::validation("message content is empty"));
        }
        if content.chars().count() > self.max_content_len {
            return Err(GatewayError::validation(format!(
                "message exceeds {} characters",
                self.max_content_len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
