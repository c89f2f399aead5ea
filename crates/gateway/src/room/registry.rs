// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Room registry: which connections are in which room.
//!
//! Each room has its own member map behind its own mutex, so activity in one
//! room never waits on another. The outer map is only write-locked to create
//! a room or to drop one that just became empty. Broadcasts copy the member
//! list under the room lock and deliver after releasing it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::room::ConnectionId;

type Members<E> = Mutex<HashMap<ConnectionId, mpsc::Sender<E>>>;
type Targets<E> = Vec<(ConnectionId, mpsc::Sender<E>)>;

/// Membership registry, generic over the event type delivered to members.
pub struct RoomRegistry<E> {
    rooms: RwLock<HashMap<String, Arc<Members<E>>>>,
}

impl<E> Default for RoomRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RoomRegistry<E> {
    pub fn new() -> Self {
        Self { rooms: RwLock::new(HashMap::new()) }
    }

    /// Add `conn` to `room`, delivering future broadcasts to `outbox`.
    ///
    /// Does not touch other rooms; the dispatcher leaves the previous room first.
    pub fn join(&self, room: &str, conn: ConnectionId, outbox: mpsc::Sender<E>) {
        {
            // Holding the read lock keeps `leave` from dropping the room under us.
            let rooms = self.rooms.read();
            if let Some(members) = rooms.get(room) {
                members.lock().insert(conn, outbox);
                return;
            }
        }
        let mut rooms = self.rooms.write();
        rooms.entry(room.to_owned()).or_default().lock().insert(conn, outbox);
    }

    /// Remove `conn` from `room`. Returns whether it was a member.
    pub fn leave(&self, room: &str, conn: ConnectionId) -> bool {
        let now_empty = {
            let rooms = self.rooms.read();
            let Some(members) = rooms.get(room) else {
                return false;
            };
            let mut members = members.lock();
            if members.remove(&conn).is_none() {
                return false;
            }
            members.is_empty()
        };
        if now_empty {
            let mut rooms = self.rooms.write();
            // Someone may have joined between the two locks.
            if rooms.get(room).is_some_and(|m| m.lock().is_empty()) {
                rooms.remove(room);
            }
        }
        true
    }

    /// Whether `conn` is currently in `room`.
    pub fn is_member(&self, room: &str, conn: ConnectionId) -> bool {
        self.rooms.read().get(room).is_some_and(|m| m.lock().contains_key(&conn))
    }

    /// Snapshot of the current members of `room`.
    pub fn members(&self, room: &str) -> Vec<ConnectionId> {
        self.rooms.read().get(room).map(|m| m.lock().keys().copied().collect()).unwrap_or_default()
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }

    fn snapshot(&self, room: &str, excluded: Option<ConnectionId>) -> Targets<E> {
        let rooms = self.rooms.read();
        let Some(members) = rooms.get(room) else {
            return Vec::new();
        };
        let members = members.lock();
        members
            .iter()
            .filter(|(id, _)| Some(**id) != excluded)
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }
}

impl<E: Clone> RoomRegistry<E> {
    /// Deliver `event` to every member of `room` at the time of the call.
    ///
    /// Best-effort and at-most-once: a member whose outbox is full or closed
    /// misses the event. Returns the number of members that accepted it.
    pub fn broadcast(&self, room: &str, event: E) -> usize {
        deliver(room, self.snapshot(room, None), event)
    }

    /// Like [`broadcast`](Self::broadcast), skipping `excluded`.
    pub fn broadcast_excluding(&self, room: &str, event: E, excluded: ConnectionId) -> usize {
        deliver(room, self.snapshot(room, Some(excluded)), event)
    }
}

fn deliver<E: Clone>(room: &str, targets: Targets<E>, event: E) -> usize {
    let mut delivered = 0;
    for (conn, tx) in targets {
        match tx.try_send(event.clone()) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(%conn, room, "outbox full, dropping broadcast");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(%conn, room, "connection closed, dropping broadcast");
            }
        }
    }
    delivered
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
