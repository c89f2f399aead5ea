// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Direct-message room keys.
//!
//! A DM is an ordinary room whose key is derived from the two usernames, so
//! both parties land in the same room regardless of who opens it.

use crate::auth::username_key;

/// Prefix shared by every derived DM room key.
pub const DM_PREFIX: &str = "dm:";

/// Canonical room key for a conversation between `a` and `b`.
///
/// Lower-cases both names and orders them, so the result is independent of
/// argument order and case. `a == b` yields `dm:<a>:<a>`; callers reject
/// self-DMs before getting here.
pub fn derive_room_key(a: &str, b: &str) -> String {
    let a = username_key(a);
    let b = username_key(b);
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("{DM_PREFIX}{first}:{second}")
}

#[cfg(test)]
#[path = "dm_tests.rs"]
mod tests;
