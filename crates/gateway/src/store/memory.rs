// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::auth::username_key;
use crate::store::{
    AuthoredMessage, BoxFuture, Message, MessageRepository, User, UserRepository, UNKNOWN_AUTHOR,
};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    /// Lower-cased username -> user id.
    names: HashMap<String, String>,
    /// Append-only, in insertion order.
    messages: Vec<Message>,
}

/// Volatile store implementing both repositories.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageRepository for MemoryStore {
    fn insert<'a>(&'a self, message: &'a Message) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.inner.write().await.messages.push(message.clone());
            Ok(())
        })
    }

    fn recent<'a>(
        &'a self,
        room: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, anyhow::Result<Vec<AuthoredMessage>>> {
        Box::pin(async move {
            let inner = self.inner.read().await;
            let mut matching: Vec<(usize, &Message)> =
                inner.messages.iter().enumerate().filter(|(_, m)| m.room == room).collect();
            // Newest first; insertion order breaks timestamp ties.
            matching.sort_by(|(ai, a), (bi, b)| (b.created_at, bi).cmp(&(a.created_at, ai)));
            Ok(matching
                .into_iter()
                .take(limit)
                .map(|(_, m)| AuthoredMessage {
                    author: inner
                        .users
                        .get(&m.sender_id)
                        .map(|u| u.username.clone())
                        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_owned()),
                    message: m.clone(),
                })
                .collect())
        })
    }
}

impl UserRepository for MemoryStore {
    fn create<'a>(&'a self, user: &'a User) -> BoxFuture<'a, anyhow::Result<bool>> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            let key = username_key(&user.username);
            if inner.names.contains_key(&key) || inner.users.contains_key(&user.id) {
                return Ok(false);
            }
            inner.names.insert(key, user.id.clone());
            inner.users.insert(user.id.clone(), user.clone());
            Ok(true)
        })
    }

    fn find_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Option<User>>> {
        Box::pin(async move {
            let inner = self.inner.read().await;
            Ok(inner
                .names
                .get(&username_key(username))
                .and_then(|id| inner.users.get(id))
                .cloned())
        })
    }

    fn find_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, anyhow::Result<Option<User>>> {
        Box::pin(async move { Ok(self.inner.read().await.users.get(id).cloned()) })
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
