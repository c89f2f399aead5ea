// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio::sync::mpsc;

use crate::room::{ConnectionId, RoomRegistry};

fn member(capacity: usize) -> (ConnectionId, mpsc::Sender<String>, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ConnectionId::next(), tx, rx)
}

#[test]
fn connection_ids_are_unique() {
    let a = ConnectionId::next();
    let b = ConnectionId::next();
    assert_ne!(a, b);
    assert!(b > a);
}

#[test]
fn broadcast_reaches_every_member() -> anyhow::Result<()> {
    let registry = RoomRegistry::new();
    let (a, a_tx, mut a_rx) = member(8);
    let (b, b_tx, mut b_rx) = member(8);
    registry.join("general", a, a_tx);
    registry.join("general", b, b_tx);

    assert_eq!(registry.broadcast("general", "hello".to_owned()), 2);
    assert_eq!(a_rx.try_recv()?, "hello");
    assert_eq!(b_rx.try_recv()?, "hello");
    Ok(())
}

#[test]
fn broadcast_does_not_cross_rooms() -> anyhow::Result<()> {
    let registry = RoomRegistry::new();
    let (a, a_tx, mut a_rx) = member(8);
    let (b, b_tx, mut b_rx) = member(8);
    registry.join("r1", a, a_tx);
    registry.join("r2", b, b_tx);

    registry.broadcast("r1", "only r1".to_owned());
    assert_eq!(a_rx.try_recv()?, "only r1");
    assert!(b_rx.try_recv().is_err());
    Ok(())
}

#[test]
fn moving_between_rooms_stops_old_broadcasts() -> anyhow::Result<()> {
    let registry = RoomRegistry::new();
    let (a, a_tx, mut a_rx) = member(8);
    registry.join("r1", a, a_tx.clone());
    assert!(registry.leave("r1", a));
    registry.join("r2", a, a_tx);

    assert_eq!(registry.broadcast("r1", "stale".to_owned()), 0);
    assert!(a_rx.try_recv().is_err());
    assert!(registry.is_member("r2", a));
    assert!(!registry.is_member("r1", a));
    Ok(())
}

#[test]
fn broadcast_excluding_skips_sender() -> anyhow::Result<()> {
    let registry = RoomRegistry::new();
    let (a, a_tx, mut a_rx) = member(8);
    let (b, b_tx, mut b_rx) = member(8);
    registry.join("general", a, a_tx);
    registry.join("general", b, b_tx);

    assert_eq!(registry.broadcast_excluding("general", "typing".to_owned(), a), 1);
    assert!(a_rx.try_recv().is_err());
    assert_eq!(b_rx.try_recv()?, "typing");
    Ok(())
}

#[test]
fn leave_is_idempotent() {
    let registry: RoomRegistry<String> = RoomRegistry::new();
    let (a, a_tx, _a_rx) = member(8);
    registry.join("general", a, a_tx);

    assert!(registry.leave("general", a));
    assert!(!registry.leave("general", a));
    assert!(!registry.leave("nowhere", a));
}

#[test]
fn unknown_room_operations_are_noops() {
    let registry: RoomRegistry<String> = RoomRegistry::new();
    assert_eq!(registry.broadcast("ghost", "x".to_owned()), 0);
    assert_eq!(registry.broadcast_excluding("ghost", "x".to_owned(), ConnectionId::next()), 0);
    assert!(registry.members("ghost").is_empty());
    assert_eq!(registry.room_count(), 0);
}

#[test]
fn empty_rooms_are_dropped() {
    let registry: RoomRegistry<String> = RoomRegistry::new();
    let (a, a_tx, _a_rx) = member(8);
    let (b, b_tx, _b_rx) = member(8);
    registry.join("general", a, a_tx);
    registry.join("general", b, b_tx);
    assert_eq!(registry.room_count(), 1);

    registry.leave("general", a);
    assert_eq!(registry.room_count(), 1);
    registry.leave("general", b);
    assert_eq!(registry.room_count(), 0);
}

#[test]
fn closed_member_is_skipped_silently() -> anyhow::Result<()> {
    let registry = RoomRegistry::new();
    let (a, a_tx, a_rx) = member(8);
    let (b, b_tx, mut b_rx) = member(8);
    registry.join("general", a, a_tx);
    registry.join("general", b, b_tx);
    drop(a_rx);

    assert_eq!(registry.broadcast("general", "still works".to_owned()), 1);
    assert_eq!(b_rx.try_recv()?, "still works");
    Ok(())
}

#[test]
fn full_outbox_drops_only_that_delivery() -> anyhow::Result<()> {
    let registry = RoomRegistry::new();
    let (a, a_tx, mut a_rx) = member(1);
    registry.join("general", a, a_tx);

    assert_eq!(registry.broadcast("general", "first".to_owned()), 1);
    assert_eq!(registry.broadcast("general", "second".to_owned()), 0);
    assert_eq!(a_rx.try_recv()?, "first");
    assert!(a_rx.try_recv().is_err());

    assert_eq!(registry.broadcast("general", "third".to_owned()), 1);
    assert_eq!(a_rx.try_recv()?, "third");
    Ok(())
}

#[test]
fn members_is_a_snapshot() {
    let registry: RoomRegistry<String> = RoomRegistry::new();
    let (a, a_tx, _a_rx) = member(8);
    registry.join("general", a, a_tx);
    let before = registry.members("general");

    let (b, b_tx, _b_rx) = member(8);
    registry.join("general", b, b_tx);

    assert_eq!(before, vec![a]);
    assert_eq!(registry.members("general").len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_join_leave_keeps_membership_consistent() -> anyhow::Result<()> {
    let registry = std::sync::Arc::new(RoomRegistry::<String>::new());
    let mut tasks = Vec::new();
    for i in 0..16 {
        let registry = std::sync::Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            let (conn, tx, _rx) = member(4);
            let room = if i % 2 == 0 { "even" } else { "odd" };
            for _ in 0..100 {
                registry.join(room, conn, tx.clone());
                registry.broadcast(room, "tick".to_owned());
                registry.leave(room, conn);
            }
            registry.join(room, conn, tx);
            conn
        }));
    }
    let mut joined = Vec::new();
    for task in tasks {
        joined.push(task.await?);
    }

    assert_eq!(registry.members("even").len() + registry.members("odd").len(), joined.len());
    assert_eq!(registry.room_count(), 2);
    Ok(())
}
