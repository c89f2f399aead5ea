// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the parley chat gateway.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "parley", version, about = "Real-time chat gateway")]
pub struct GatewayConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "PARLEY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 3000, env = "PARLEY_PORT")]
    pub port: u16,

    /// HMAC secret used to sign and verify bearer tokens.
    #[arg(long, env = "PARLEY_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Lifetime of issued access tokens, in seconds.
    #[arg(long, default_value_t = 86_400, env = "PARLEY_TOKEN_TTL_SECS")]
    pub token_ttl_secs: u64,

    /// SQLite database URL (e.g. `sqlite://parley.db`). Unset keeps everything in memory.
    #[arg(long, env = "PARLEY_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Number of messages returned by a `history` request.
    #[arg(long, default_value_t = 50, env = "PARLEY_HISTORY_LIMIT")]
    pub history_limit: usize,

    /// Per-connection outbound queue depth. Broadcasts to a full queue are dropped.
    #[arg(long, default_value_t = 256, env = "PARLEY_OUTBOX_CAPACITY")]
    pub outbox_capacity: usize,

    /// Maximum message length in characters.
    #[arg(long, default_value_t = 4000, env = "PARLEY_MAX_CONTENT_LEN")]
    pub max_content_len: usize,

    /// Allowed browser origin for CORS. Unset allows any origin.
    #[arg(long, env = "PARLEY_CORS_ORIGIN")]
    pub cors_origin: Option<String>,
}

impl GatewayConfig {
    pub fn token_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.token_ttl_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
