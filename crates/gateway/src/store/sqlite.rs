// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::auth::{username_key, Role};
use crate::store::{
    AuthoredMessage, BoxFuture, Message, MessageRepository, User, UserRepository, UNKNOWN_AUTHOR,
};

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        username TEXT NOT NULL,
        username_key TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        room TEXT NOT NULL,
        sender_id TEXT NOT NULL,
        recipient_id TEXT,
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS messages_room_created ON messages (room, created_at)",
];

type UserRow = (String, String, String, String, i64);
type MessageRow = (String, String, String, Option<String>, String, i64, String);

/// SQLite-backed store implementing both repositories.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and apply the schema.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url {url}"))?
            .create_if_missing(true);
        // An in-memory database lives only as long as its single connection.
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new().max_connections(5).connect_with(options).await
        }
        .with_context(|| format!("failed to open database {url}"))?;

        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&pool).await.context("failed to apply schema")?;
        }
        Ok(Self { pool })
    }
}

fn timestamp(ms: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| anyhow::anyhow!("timestamp out of range: {ms}"))
}

fn user_from_row((id, username, password_hash, role, created_at): UserRow) -> anyhow::Result<User> {
    Ok(User {
        id,
        username,
        password_hash,
        role: Role::from_str(&role)?,
        created_at: timestamp(created_at)?,
    })
}

impl MessageRepository for SqliteStore {
    fn insert<'a>(&'a self, message: &'a Message) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO messages (id, room, sender_id, recipient_id, content, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&message.id)
            .bind(&message.room)
            .bind(&message.sender_id)
            .bind(&message.recipient_id)
            .bind(&message.content)
            .bind(message.created_at.timestamp_millis())
            .execute(&self.pool)
            .await
            .context("failed to insert message")?;
            Ok(())
        })
    }

    fn recent<'a>(
        &'a self,
        room: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, anyhow::Result<Vec<AuthoredMessage>>> {
        Box::pin(async move {
            let rows: Vec<MessageRow> = sqlx::query_as(
                "SELECT m.id, m.room, m.sender_id, m.recipient_id, m.content, m.created_at,
                        COALESCE(u.username, ?)
                 FROM messages m LEFT JOIN users u ON u.id = m.sender_id
                 WHERE m.room = ?
                 ORDER BY m.created_at DESC, m.seq DESC
                 LIMIT ?",
            )
            .bind(UNKNOWN_AUTHOR)
            .bind(room)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .context("failed to load history")?;

            rows.into_iter()
                .map(|(id, room, sender_id, recipient_id, content, created_at, author)| {
                    Ok(AuthoredMessage {
                        message: Message {
                            id,
                            room,
                            sender_id,
                            recipient_id,
                            content,
                            created_at: timestamp(created_at)?,
                        },
                        author,
                    })
                })
                .collect()
        })
    }
}

impl UserRepository for SqliteStore {
    fn create<'a>(&'a self, user: &'a User) -> BoxFuture<'a, anyhow::Result<bool>> {
        Box::pin(async move {
            let result = sqlx::query(
                "INSERT INTO users (id, username, username_key, password_hash, role, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT DO NOTHING",
            )
            .bind(&user.id)
            .bind(&user.username)
            .bind(username_key(&user.username))
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.created_at.timestamp_millis())
            .execute(&self.pool)
            .await
            .context("failed to insert user")?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn find_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Option<User>>> {
        Box::pin(async move {
            let row: Option<UserRow> = sqlx::query_as(
                "SELECT id, username, password_hash, role, created_at
                 FROM users WHERE username_key = ?",
            )
            .bind(username_key(username))
            .fetch_optional(&self.pool)
            .await
            .context("failed to look up user")?;
            row.map(user_from_row).transpose()
        })
    }

    fn find_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, anyhow::Result<Option<User>>> {
        Box::pin(async move {
            let row: Option<UserRow> = sqlx::query_as(
                "SELECT id, username, password_hash, role, created_at FROM users WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to look up user")?;
            row.map(user_from_row).transpose()
        })
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
