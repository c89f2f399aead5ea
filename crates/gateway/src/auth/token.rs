// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HS256 bearer tokens.

use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::{Identity, Role};
use crate::error::GatewayError;

/// Claims embedded in every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Stable user id.
    pub sub: String,
    pub username: String,
    #[serde(default)]
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Claims for `identity`, valid from now for `ttl`.
    pub fn for_identity(identity: &Identity, ttl: Duration) -> Self {
        let iat = chrono::Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Self {
            sub: identity.id.clone(),
            username: identity.username.clone(),
            role: identity.role,
            iat,
            exp: iat.saturating_add(ttl),
        }
    }
}

/// Signs and verifies access tokens with a shared secret.
pub struct Authenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl Authenticator {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Mint an access token for `identity`.
    pub fn issue(&self, identity: &Identity) -> Result<String, GatewayError> {
        self.sign(&Claims::for_identity(identity, self.ttl))
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, GatewayError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| GatewayError::internal(format!("token signing failed: {e}")))
    }

    /// Verify signature and expiry of `credential` and extract the identity.
    pub fn authenticate(&self, credential: &str) -> Result<Identity, GatewayError> {
        let data = jsonwebtoken::decode::<Claims>(credential, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => GatewayError::unauthorized("token expired"),
                _ => GatewayError::unauthorized("invalid token"),
            })?;
        let claims = data.claims;
        if claims.sub.is_empty() || claims.username.is_empty() {
            return Err(GatewayError::unauthorized("token is missing identity claims"));
        }
        Ok(Identity { id: claims.sub, username: claims.username, role: claims.role })
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
