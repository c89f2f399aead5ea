// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection authentication: identities, bearer tokens, and password hashing.

pub mod password;
pub mod token;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

pub use token::{Authenticator, Claims};

/// Longest accepted username, in characters.
pub const MAX_USERNAME_LEN: usize = 32;

/// Account role carried in the token claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(GatewayError::validation(format!("unknown role: {other}"))),
        }
    }
}

/// Who is on the other end of a connection.
///
/// Derived from the credential at handshake and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl Identity {
    /// Usernames compare case-insensitively everywhere in the gateway.
    pub fn is_named(&self, username: &str) -> bool {
        username_key(&self.username) == username_key(username)
    }
}

/// Case-folded form under which usernames are unique. DM room keys fold the
/// same way.
pub fn username_key(username: &str) -> String {
    username.to_lowercase()
}

/// Check a (trimmed) username for signup.
///
/// `:` is reserved because DM room keys use it as a separator.
pub fn validate_username(username: &str) -> Result<(), GatewayError> {
    if username.is_empty() {
        return Err(GatewayError::validation("username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(GatewayError::validation(format!(
            "username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    if username.chars().any(|c| c == ':' || c.is_control()) {
        return Err(GatewayError::validation("username contains invalid characters"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
