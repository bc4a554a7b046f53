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

//! External-authentication authority for the conference focus service.
//!
//! Participants prove they are allowed to create a conference room by
//! authenticating with an external, browser-redirect based identity
//! provider. This crate owns the two short-lived object families behind that
//! flow: pending tokens and proven authentication states. A periodic expiry
//! task bounds their lifetime, and a room-lifecycle hook releases them when
//! a conference is destroyed.
//!
//! All state is in memory: a process restart invalidates every token and
//! pre-authentication.

pub mod authority;
pub mod config;
pub mod error;
pub mod focus;
pub mod listener;
pub mod models;

pub use authority::ExternalAuthAuthority;
pub use config::AuthorityConfig;
pub use error::AuthError;
pub use focus::{ConferenceHandle, FocusAllocationListener, FocusManager};
pub use listener::IdentityBindListener;
