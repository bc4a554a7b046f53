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

//! Contracts on the conference-allocator side.
//!
//! The authority consumes [`FocusManager`] to ask whether a conference
//! currently exists and to subscribe for destruction notifications; it
//! implements [`FocusAllocationListener`] itself. The allocator internals are
//! out of scope here.

use std::sync::Arc;

/// Opaque handle to a live conference.
#[derive(Debug, Clone)]
pub struct ConferenceHandle {
    /// The room name the conference was allocated under.
    pub room_name: String,
}

impl ConferenceHandle {
    pub fn new(room_name: impl Into<String>) -> Self {
        Self {
            room_name: room_name.into(),
        }
    }
}

/// The slice of the conference allocator the authority depends on.
pub trait FocusManager: Send + Sync {
    /// Return a handle to the live conference for `room_name`, or `None` if
    /// no such conference exists.
    fn get_conference(&self, room_name: &str) -> Option<ConferenceHandle>;

    /// Register (or with `None`, clear) the listener notified when a
    /// conference is destroyed.
    fn set_focus_allocation_listener(&self, listener: Option<Arc<dyn FocusAllocationListener>>);
}

/// Receives conference-destroyed notifications from the [`FocusManager`].
pub trait FocusAllocationListener: Send + Sync {
    /// Called by the focus manager after the conference for `room_name` has
    /// been torn down.
    fn on_focus_destroyed(&self, room_name: &str);
}
