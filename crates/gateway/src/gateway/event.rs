// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire events exchanged over the WebSocket.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::store::AuthoredMessage;

/// Events a client may send.
///
/// A missing `room` or `content` decodes as empty and is rejected by the
/// dispatcher, so the sender gets an error event rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Join {
        #[serde(default)]
        room: String,
    },
    Leave {
        #[serde(default)]
        room: String,
    },
    Message {
        #[serde(default)]
        room: String,
        #[serde(default)]
        content: String,
        #[serde(default, alias = "toUsername", skip_serializing_if = "Option::is_none")]
        to_username: Option<String>,
    },
    History {
        #[serde(default)]
        room: String,
    },
    Typing {
        #[serde(default)]
        room: String,
    },
    OpenDm {
        #[serde(default)]
        username: String,
    },
    Ping {},
}

impl ClientEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Message { .. } => "message",
            Self::History { .. } => "history",
            Self::Typing { .. } => "typing",
            Self::OpenDm { .. } => "open_dm",
            Self::Ping {} => "ping",
        }
    }
}

/// One entry of a `history` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub room: String,
    pub author: String,
    pub content: String,
    pub time: String,
    /// Whether the requester wrote this message.
    pub mine: bool,
}

impl HistoryEntry {
    pub fn from_authored(entry: AuthoredMessage, requester_id: &str) -> Self {
        Self {
            mine: entry.message.sender_id == requester_id,
            room: entry.message.room,
            author: entry.author,
            content: entry.message.content,
            time: format_time(entry.message.created_at),
        }
    }
}

/// Events the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    System {
        content: String,
        time: String,
    },
    Message {
        room: String,
        author: String,
        content: String,
        time: String,
    },
    History {
        room: String,
        messages: Vec<HistoryEntry>,
    },
    Typing {
        author: String,
        time: String,
    },
    DmOpened {
        room: String,
        with: String,
    },
    Error {
        code: String,
        message: String,
    },
    Pong {},
}

impl ServerEvent {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System { content: content.into(), time: now() }
    }

    pub fn error(err: &GatewayError) -> Self {
        Self::Error { code: err.code.as_str().to_owned(), message: err.message.clone() }
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2026-01-02T03:04:05.678Z`.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now() -> String {
    format_time(Utc::now())
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
