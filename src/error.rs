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

//! Error type for authority construction.
//!
//! Runtime failures (unknown tokens, shutdown races, empty addresses) are not
//! errors: they are logged and surfaced as `false` returns, and the caller
//! re-drives the flow. Only a bad configuration refuses to construct.

/// Error raised when the authority cannot be built from its configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// The authentication URL template is empty or does not contain exactly
    /// one `%s` token slot.
    InvalidConfiguration(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidConfiguration(detail) => {
                write!(f, "invalid configuration: {detail}")
            }
        }
    }
}

impl std::error::Error for AuthError {}
