// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use crate::config::GatewayConfig;

#[test]
fn defaults_apply_with_only_a_secret() -> anyhow::Result<()> {
    let config = GatewayConfig::try_parse_from(["parley", "--jwt-secret", "s3cret"])?;
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 3000);
    assert_eq!(config.jwt_secret, "s3cret");
    assert_eq!(config.token_ttl(), Duration::from_secs(86_400));
    assert_eq!(config.database_url, None);
    assert_eq!(config.history_limit, 50);
    assert_eq!(config.outbox_capacity, 256);
    assert_eq!(config.max_content_len, 4000);
    assert_eq!(config.cors_origin, None);
    Ok(())
}

#[test]
fn flags_override_defaults() -> anyhow::Result<()> {
    let config = GatewayConfig::try_parse_from([
        "parley",
        "--jwt-secret",
        "s",
        "--port",
        "8080",
        "--database-url",
        "sqlite://chat.db",
        "--history-limit",
        "10",
        "--token-ttl-secs",
        "60",
    ])?;
    assert_eq!(config.port, 8080);
    assert_eq!(config.database_url.as_deref(), Some("sqlite://chat.db"));
    assert_eq!(config.history_limit, 10);
    assert_eq!(config.token_ttl(), Duration::from_secs(60));
    Ok(())
}

#[test]
fn invalid_port_is_rejected() {
    let result = GatewayConfig::try_parse_from(["parley", "--jwt-secret", "s", "--port", "99999"]);
    assert!(result.is_err());
}
