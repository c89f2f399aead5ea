// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection dispatcher and the events it speaks.

pub mod event;
pub mod session;

pub use event::{ClientEvent, HistoryEntry, ServerEvent};
pub use session::{Phase, Session};
