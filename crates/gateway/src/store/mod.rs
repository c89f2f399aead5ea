// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable storage for users and messages.
//!
//! The gateway only talks to the repository traits; [`memory::MemoryStore`]
//! and [`sqlite::SqliteStore`] are the two backends.

pub mod gateway;
pub mod memory;
pub mod sqlite;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::auth::{Identity, Role};

pub use gateway::MessageGateway;

/// Boxed future returned by the object-safe repository traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>, role: Role) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            password_hash: password_hash.into(),
            role,
            created_at: Utc::now(),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity { id: self.id.clone(), username: self.username.clone(), role: self.role }
    }
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub room: String,
    pub sender_id: String,
    /// Set only for direct messages. Informational; delivery is still room-wide.
    pub recipient_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A message joined with its sender's current username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoredMessage {
    pub message: Message,
    pub author: String,
}

/// Placeholder author for messages whose sender no longer resolves.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Message log.
pub trait MessageRepository: Send + Sync {
    /// Store `message` in full or not at all.
    fn insert<'a>(&'a self, message: &'a Message) -> BoxFuture<'a, anyhow::Result<()>>;

    /// Up to `limit` most recent messages in `room`, newest first.
    fn recent<'a>(
        &'a self,
        room: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, anyhow::Result<Vec<AuthoredMessage>>>;
}

/// Account store. Username lookups are case-insensitive.
pub trait UserRepository: Send + Sync {
    /// Insert `user`. Returns `false` if the username is already taken.
    fn create<'a>(&'a self, user: &'a User) -> BoxFuture<'a, anyhow::Result<bool>>;

    fn find_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Option<User>>>;

    fn find_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, anyhow::Result<Option<User>>>;
}

/// The pair of repositories the gateway runs against.
#[derive(Clone)]
pub struct Stores {
    pub messages: Arc<dyn MessageRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Stores {
    /// Fresh in-memory stores.
    pub fn memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self { messages: store.clone(), users: store }
    }

    /// Open the configured backend: SQLite when `database_url` is set, memory otherwise.
    pub async fn open(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            Some(url) => {
                let store = Arc::new(sqlite::SqliteStore::connect(url).await?);
                tracing::info!(url, "using sqlite store");
                Ok(Self { messages: store.clone(), users: store })
            }
            None => {
                tracing::info!("using in-memory store; messages are lost on restart");
                Ok(Self::memory())
            }
        }
    }
}
