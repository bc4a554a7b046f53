/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Authority configuration, immutable after construction.

use std::collections::HashSet;
use std::env;
use std::time::Duration;

/// Max time an unredeemed token lives.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_millis(60_000);
/// Max time an authentication state lives while its room does not exist.
pub const DEFAULT_PRE_AUTH_LIFETIME: Duration = Duration::from_millis(30_000);
/// Interval at which the expiry task checks both tables.
pub const DEFAULT_EXPIRE_POLL_INTERVAL: Duration = Duration::from_millis(10_000);

/// Configuration for the external-authentication authority.
#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    /// Authentication URL template with one `%s` slot for the token string,
    /// e.g. `https://idp.example.net/auth?token=%s`.
    pub url_template: String,
    /// Room local-parts that may be created without authentication.
    pub reserved_rooms: HashSet<String>,
    /// Max time an unredeemed token lives (default: 60 s).
    pub token_lifetime: Duration,
    /// Max time a state lives without its room existing (default: 30 s).
    pub pre_auth_lifetime: Duration,
    /// Expiry poll interval (default: 10 s).
    pub expire_poll_interval: Duration,
}

impl AuthorityConfig {
    /// Build a configuration with the given URL template and defaults for
    /// everything else.
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            reserved_rooms: HashSet::new(),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            pre_auth_lifetime: DEFAULT_PRE_AUTH_LIFETIME,
            expire_poll_interval: DEFAULT_EXPIRE_POLL_INTERVAL,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Required
    /// - `AUTH_URL_TEMPLATE`
    ///
    /// # Optional
    /// - `AUTH_TOKEN_LIFETIME_MS` (default: `"60000"`)
    /// - `AUTH_PRE_AUTH_LIFETIME_MS` (default: `"30000"`)
    /// - `AUTH_EXPIRE_POLL_INTERVAL_MS` (default: `"10000"`)
    /// - `AUTH_RESERVED_ROOMS` (CSV of room local-parts, default: empty)
    pub fn from_env() -> Result<Self, String> {
        let url_template = env::var("AUTH_URL_TEMPLATE")
            .map_err(|_| "AUTH_URL_TEMPLATE environment variable is required")?;

        let token_lifetime = duration_from_env("AUTH_TOKEN_LIFETIME_MS", DEFAULT_TOKEN_LIFETIME)?;
        let pre_auth_lifetime =
            duration_from_env("AUTH_PRE_AUTH_LIFETIME_MS", DEFAULT_PRE_AUTH_LIFETIME)?;
        let expire_poll_interval =
            duration_from_env("AUTH_EXPIRE_POLL_INTERVAL_MS", DEFAULT_EXPIRE_POLL_INTERVAL)?;

        let reserved_rooms =
            parse_reserved_rooms(&env::var("AUTH_RESERVED_ROOMS").unwrap_or_default());

        Ok(Self {
            url_template,
            reserved_rooms,
            token_lifetime,
            pre_auth_lifetime,
            expire_poll_interval,
        })
    }
}

fn duration_from_env(key: &str, default: Duration) -> Result<Duration, String> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| format!("{key} must be a valid integer of milliseconds")),
        Err(_) => Ok(default),
    }
}

/// Parse the reserved-rooms CSV. Entries are trimmed; empty entries dropped.
fn parse_reserved_rooms(csv: &str) -> HashSet<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|room| !room.is_empty())
        .map(str::to_string)
        .collect()
}
