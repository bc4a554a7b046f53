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

//! The two short-lived records the authority keeps in memory.
//!
//! An [`AuthenticationToken`] is issued when a participant asks for an
//! authentication URL and is single-use: it is consumed by the redirect
//! handler, or released when its room is destroyed or its lifetime elapses.
//! An [`AuthenticationState`] is the proven binding between a participant
//! address and an external identity, created the moment a token is consumed.

use rand::Rng;
use tokio::time::Instant;

const TOKEN_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
// 32 chars over a 36-symbol alphabet is ~165 bits of entropy.
const TOKEN_LENGTH: usize = 32;

/// Generate a fresh token string from the thread-local CSPRNG.
pub(crate) fn generate_token_string() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..TOKEN_CHARSET.len());
            TOKEN_CHARSET[idx] as char
        })
        .collect()
}

/// An unredeemed issuance record, keyed by its token string.
#[derive(Debug, Clone)]
pub struct AuthenticationToken {
    /// The opaque, unguessable token string embedded in the URL.
    pub token_string: String,
    /// The chat-network address of the participant the token was issued to.
    pub participant_address: String,
    /// The full room name as supplied at issuance (domain suffix included).
    pub room_name: String,
    /// Monotonic issuance timestamp; the token expires `token_lifetime`
    /// after this.
    pub created_at: Instant,
}

impl AuthenticationToken {
    pub fn new(token_string: String, participant_address: &str, room_name: &str) -> Self {
        Self {
            token_string,
            participant_address: participant_address.to_string(),
            room_name: room_name.to_string(),
            created_at: Instant::now(),
        }
    }
}

/// A proven binding between a participant address and an external identity,
/// valid for the lifetime of its room.
#[derive(Debug, Clone)]
pub struct AuthenticationState {
    /// The participant address the identity is bound to (table key).
    pub participant_address: String,
    /// The full room name carried over from the consumed token.
    pub room_name: String,
    /// The subject assertion returned by the identity provider.
    pub authenticated_identity: String,
    /// Monotonic binding timestamp; drives pre-authentication expiry while
    /// the room does not exist.
    pub authenticated_at: Instant,
}

impl AuthenticationState {
    pub fn new(participant_address: &str, room_name: &str, authenticated_identity: &str) -> Self {
        Self {
            participant_address: participant_address.to_string(),
            room_name: room_name.to_string(),
            authenticated_identity: authenticated_identity.to_string(),
            authenticated_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_string_has_expected_length_and_charset() {
        let token = generate_token_string();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }

    #[test]
    fn token_strings_do_not_repeat() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(generate_token_string()));
        }
    }

    #[test]
    fn token_records_issuance_inputs() {
        let token = AuthenticationToken::new(generate_token_string(), "u1@x", "room1@conf.x");
        assert_eq!(token.participant_address, "u1@x");
        assert_eq!(token.room_name, "room1@conf.x");
    }

    #[test]
    fn state_records_binding_inputs() {
        let state = AuthenticationState::new("u1@x", "room1", "alice@idp");
        assert_eq!(state.participant_address, "u1@x");
        assert_eq!(state.room_name, "room1");
        assert_eq!(state.authenticated_identity, "alice@idp");
    }
}
