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

//! The external-authentication authority.
//!
//! Authentication flow:
//!
//! 1. A participant asks for an authentication URL; the URL embeds a fresh
//!    token identifying the request. See
//!    [`ExternalAuthAuthority::create_authentication_url`].
//! 2. The participant visits the URL and authenticates with the external
//!    identity provider.
//! 3. The provider redirects back to the redirect handler, which presents
//!    the token together with the asserted identity. The token is consumed
//!    and the identity is bound to the participant address. See
//!    [`ExternalAuthAuthority::authenticate`].
//! 4. The participant address stays authenticated for the lifetime of the
//!    conference.
//!
//! Tokens that are never redeemed expire after the token lifetime. A binding
//! whose room is never created expires after the pre-authentication
//! lifetime; once the room exists, the binding lives until the room is
//! destroyed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tracing::{error, info, warn};

use crate::config::AuthorityConfig;
use crate::error::AuthError;
use crate::focus::{FocusAllocationListener, FocusManager};
use crate::listener::{IdentityBindListener, IdentityBindListeners};
use crate::models::{generate_token_string, AuthenticationState, AuthenticationToken};

/// The two tables, guarded together by one mutex so that token consumption
/// and state insertion are a single atomic step.
#[derive(Default)]
struct AuthTables {
    /// Token string -> unredeemed token.
    tokens: HashMap<String, AuthenticationToken>,
    /// Participant address -> proven binding. At most one per address.
    states: HashMap<String, AuthenticationState>,
}

/// Keeps track of participant authentication with an external, browser
/// redirect based identity provider.
pub struct ExternalAuthAuthority {
    config: AuthorityConfig,
    tables: Mutex<AuthTables>,
    listeners: IdentityBindListeners,
    /// Cleared by [`stop`](Self::stop); the expiry tick treats `None` as
    /// shutdown in progress.
    focus_manager: Mutex<Option<Arc<dyn FocusManager>>>,
    expire_task: Mutex<Option<JoinHandle<()>>>,
}

impl ExternalAuthAuthority {
    /// Build an authority from its configuration.
    ///
    /// Fails with [`AuthError::InvalidConfiguration`] unless the URL template
    /// contains exactly one `%s` token slot.
    pub fn new(config: AuthorityConfig) -> Result<Self, AuthError> {
        if config.url_template.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "authentication URL template is empty".to_string(),
            ));
        }
        let slots = config.url_template.matches("%s").count();
        if slots != 1 {
            return Err(AuthError::InvalidConfiguration(format!(
                "authentication URL template must contain exactly one %s slot, found {slots}"
            )));
        }

        info!(
            "Token lifetime: {:?}, pre-auth lifetime: {:?}",
            config.token_lifetime, config.pre_auth_lifetime
        );

        Ok(Self {
            config,
            tables: Mutex::new(AuthTables::default()),
            listeners: IdentityBindListeners::new(),
            focus_manager: Mutex::new(None),
            expire_task: Mutex::new(None),
        })
    }

    /// Start this authority: register with the focus manager for
    /// conference-destroyed notifications and schedule the expiry task.
    /// Idempotent; a second call while running is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self: Arc<Self>, focus_manager: Arc<dyn FocusManager>) {
        {
            let mut task_slot = self.expire_task.lock().unwrap();
            if task_slot.is_some() {
                return;
            }

            *self.focus_manager.lock().unwrap() = Some(focus_manager.clone());

            // The task holds a weak reference so a dropped authority does
            // not stay alive through its own timer.
            let authority = Arc::downgrade(&self);
            let poll_interval = self.config.expire_poll_interval;
            *task_slot = Some(tokio::spawn(async move {
                let mut ticker = interval(poll_interval);
                // The first tick completes immediately; the first real
                // check runs one full interval after start.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let Some(authority) = authority.upgrade() else {
                        break;
                    };
                    authority.expire_tick();
                }
            }));
        }

        // Registration happens outside the authority's own locks.
        focus_manager.set_focus_allocation_listener(Some(self as Arc<dyn FocusAllocationListener>));
    }

    /// Stop this authority. Cancels the expiry task and drains an in-flight
    /// tick, de-registers from the focus manager, and releases all pending
    /// tokens and authentication states. Idempotent.
    pub async fn stop(&self) {
        let task = self.expire_task.lock().unwrap().take();
        if let Some(task) = task {
            task.abort();
            // An aborted task only terminates at an await point, so a tick
            // running inside it finishes before this returns.
            let _ = task.await;
        }

        let focus_manager = self.focus_manager.lock().unwrap().take();
        if let Some(focus_manager) = focus_manager {
            focus_manager.set_focus_allocation_listener(None);
        }

        let mut tables = self.tables.lock().unwrap();
        let (tokens, states) = (tables.tokens.len(), tables.states.len());
        tables.tokens.clear();
        tables.states.clear();
        if tokens > 0 || states > 0 {
            info!(
                "Released {} pending token(s) and {} authentication state(s) on stop",
                tokens, states
            );
        }
    }

    /// Create a URL for the participant to authenticate with the external
    /// identity provider. The URL is valid for `room_name` and embeds a
    /// fresh single-use token.
    ///
    /// Both `participant_address` and `room_name` must be non-empty.
    pub fn create_authentication_url(&self, participant_address: &str, room_name: &str) -> String {
        let token_string = {
            let mut tables = self.tables.lock().unwrap();
            let mut token_string = generate_token_string();
            while tables.tokens.contains_key(&token_string) {
                token_string = generate_token_string();
            }
            let token =
                AuthenticationToken::new(token_string.clone(), participant_address, room_name);
            tables.tokens.insert(token_string.clone(), token);
            token_string
        };
        self.config.url_template.replacen("%s", &token_string, 1)
    }

    /// Finish the authentication process: consume the token presented by the
    /// redirect handler and bind `external_identity` to the participant
    /// address the token was issued to.
    ///
    /// An existing binding for the same address is overwritten, which is how
    /// re-authentication works. Returns `false` if the token is unknown
    /// (never issued, already consumed, or expired).
    pub fn authenticate(&self, token_string: &str, external_identity: &str) -> bool {
        let participant_address = {
            let mut tables = self.tables.lock().unwrap();
            let token = match tables.tokens.remove(token_string) {
                Some(token) => token,
                None => {
                    error!("Invalid token: {}", token_string);
                    return false;
                }
            };

            let state = AuthenticationState::new(
                &token.participant_address,
                &token.room_name,
                external_identity,
            );
            tables.states.insert(state.participant_address.clone(), state);
            token.participant_address
        };

        // Listeners run after the critical section; the authority mutex is
        // never held across a callback.
        self.listeners
            .notify_all(&participant_address, external_identity);
        true
    }

    /// Whether the participant may create `room_name`: true when the room's
    /// local part is reserved, or when any binding exists for the address
    /// (a binding grants the right to create the room it later claims).
    pub fn is_allowed_to_create_room(&self, participant_address: &str, room_name: &str) -> bool {
        if participant_address.is_empty() {
            warn!("Empty participant address in create-room check");
            return false;
        }
        if self.is_room_reserved(room_name) {
            return true;
        }
        self.tables
            .lock()
            .unwrap()
            .states
            .contains_key(participant_address)
    }

    /// Whether the participant is authenticated within `room_name`. A
    /// binding for room A does not authenticate its holder within room B.
    pub fn is_user_authenticated(&self, participant_address: &str, room_name: &str) -> bool {
        if participant_address.is_empty() {
            warn!("Empty participant address in authentication check");
            return false;
        }
        self.tables
            .lock()
            .unwrap()
            .states
            .get(participant_address)
            .map(|state| state.room_name == room_name)
            .unwrap_or(false)
    }

    /// This authority relies on an external identity provider.
    pub fn is_external(&self) -> bool {
        true
    }

    /// Register a listener for identity-bind notifications.
    pub fn add_identity_bind_listener(&self, listener: Arc<dyn IdentityBindListener>) {
        self.listeners.add(listener);
    }

    /// Remove a previously registered listener (pointer identity).
    pub fn remove_identity_bind_listener(&self, listener: &Arc<dyn IdentityBindListener>) {
        self.listeners.remove(listener);
    }

    /// The reserved check compares the room's trimmed local part only; the
    /// full room string is what tokens and bindings store.
    fn is_room_reserved(&self, room_name: &str) -> bool {
        let local_part = room_name.split('@').next().unwrap_or(room_name).trim();
        self.config.reserved_rooms.contains(local_part)
    }

    /// One pass of the expiry task.
    ///
    /// Both tables are snapshotted under the mutex and examined outside it:
    /// the focus manager must never be queried while the authority mutex is
    /// held.
    fn expire_tick(&self) {
        let focus_manager = match self.focus_manager.lock().unwrap().clone() {
            Some(focus_manager) => focus_manager,
            // Shutting down.
            None => return,
        };
        let now = Instant::now();

        let tokens: Vec<AuthenticationToken> = {
            let tables = self.tables.lock().unwrap();
            tables.tokens.values().cloned().collect()
        };
        for token in tokens {
            if now.duration_since(token.created_at) > self.config.token_lifetime {
                self.expire_token(&token);
            }
        }

        // Pre-authentications only: a binding whose room exists is anchored
        // to the room's lifetime and is released by on_focus_destroyed.
        let states: Vec<AuthenticationState> = {
            let tables = self.tables.lock().unwrap();
            tables.states.values().cloned().collect()
        };
        for state in states {
            if focus_manager.get_conference(&state.room_name).is_some() {
                continue;
            }
            if now.duration_since(state.authenticated_at) > self.config.pre_auth_lifetime {
                self.remove_authentication(&state);
            }
        }
    }

    fn expire_token(&self, token: &AuthenticationToken) {
        let mut tables = self.tables.lock().unwrap();
        if tables.tokens.remove(&token.token_string).is_some() {
            info!("Expiring token: {}", token.token_string);
        }
    }

    /// Remove a binding snapshotted by the expiry pass. A re-authentication
    /// may have replaced the entry since the snapshot was taken; the
    /// timestamp comparison keeps the fresh binding in place.
    fn remove_authentication(&self, state: &AuthenticationState) {
        let mut tables = self.tables.lock().unwrap();
        let is_same_binding = tables
            .states
            .get(&state.participant_address)
            .map(|current| current.authenticated_at == state.authenticated_at)
            .unwrap_or(false);
        if is_same_binding {
            tables.states.remove(&state.participant_address);
            info!(
                "Authentication removed: {} in room {}",
                state.participant_address, state.room_name
            );
        }
    }
}

impl FocusAllocationListener for ExternalAuthAuthority {
    /// Release every token and binding that belongs to the destroyed room.
    /// Runs entirely under the table mutex: when this returns, no trace of
    /// the room remains.
    fn on_focus_destroyed(&self, room_name: &str) {
        let mut tables = self.tables.lock().unwrap();

        let expired: Vec<String> = tables
            .tokens
            .values()
            .filter(|token| token.room_name == room_name)
            .map(|token| token.token_string.clone())
            .collect();
        for token_string in expired {
            tables.tokens.remove(&token_string);
            info!("Expiring token: {}", token_string);
        }

        let removed: Vec<String> = tables
            .states
            .values()
            .filter(|state| state.room_name == room_name)
            .map(|state| state.participant_address.clone())
            .collect();
        for participant_address in removed {
            tables.states.remove(&participant_address);
            info!(
                "Authentication removed: {} in room {}",
                participant_address, room_name
            );
        }
    }
}
