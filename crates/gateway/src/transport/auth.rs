// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Credential presented at the WebSocket handshake.
///
/// The `?token=` query parameter wins over the header, since browsers cannot
/// set headers on a WebSocket upgrade.
pub fn credential_from<'a>(
    headers: &'a HeaderMap,
    query_token: Option<&'a str>,
) -> Option<&'a str> {
    query_token.filter(|token| !token.is_empty()).or_else(|| bearer_token(headers))
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
