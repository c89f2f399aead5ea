// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::auth::{Authenticator, Claims, Identity, Role};
use crate::error::ErrorCode;

fn alice() -> Identity {
    Identity { id: "u-alice".to_owned(), username: "Alice".to_owned(), role: Role::Admin }
}

#[test]
fn issued_token_authenticates_to_same_identity() -> anyhow::Result<()> {
    let auth = Authenticator::new("secret", Duration::from_secs(60));
    let token = auth.issue(&alice())?;
    assert_eq!(auth.authenticate(&token)?, alice());
    Ok(())
}

#[test]
fn token_from_other_secret_is_rejected() -> anyhow::Result<()> {
    let issuer = Authenticator::new("secret-a", Duration::from_secs(60));
    let verifier = Authenticator::new("secret-b", Duration::from_secs(60));
    let token = issuer.issue(&alice())?;

    let err = verifier.authenticate(&token).err();
    assert_eq!(err.map(|e| e.code), Some(ErrorCode::Unauthorized));
    Ok(())
}

#[test]
fn expired_token_is_rejected() -> anyhow::Result<()> {
    let auth = Authenticator::new("secret", Duration::from_secs(60));
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: "u-alice".to_owned(),
        username: "Alice".to_owned(),
        role: Role::User,
        iat: now - 7200,
        exp: now - 3600,
    };
    let token = auth.sign(&claims)?;

    let err = auth.authenticate(&token).err().ok_or_else(|| anyhow::anyhow!("accepted"))?;
    assert_eq!(err.code, ErrorCode::Unauthorized);
    assert_eq!(err.message, "token expired");
    Ok(())
}

#[test]
fn garbage_token_is_rejected() {
    let auth = Authenticator::new("secret", Duration::from_secs(60));
    for credential in ["", "abc", "a.b.c", "Bearer x"] {
        assert!(auth.authenticate(credential).is_err(), "accepted {credential:?}");
    }
}

#[test]
fn token_missing_username_is_rejected() -> anyhow::Result<()> {
    let auth = Authenticator::new("secret", Duration::from_secs(60));
    let mut claims = Claims::for_identity(&alice(), Duration::from_secs(60));
    claims.username.clear();
    let token = auth.sign(&claims)?;
    assert!(auth.authenticate(&token).is_err());
    Ok(())
}

#[test]
fn claims_expiry_follows_ttl() {
    let claims = Claims::for_identity(&alice(), Duration::from_secs(90));
    assert_eq!(claims.exp - claims.iat, 90);
    assert_eq!(claims.sub, "u-alice");
    assert_eq!(claims.role, Role::Admin);
}
