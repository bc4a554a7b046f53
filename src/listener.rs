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

//! Identity-bind notifications.
//!
//! [`IdentityBindListeners`] is the fan-out helper the authority publishes
//! through. Listeners are always invoked after the authority's critical
//! section, never under its mutex, and a panicking listener does not stop the
//! remaining listeners from running.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use tracing::error;

/// Receives a notification whenever a participant address becomes bound to an
/// external identity.
pub trait IdentityBindListener: Send + Sync {
    /// Fired exactly once per successful token consumption.
    fn on_user_authenticated(&self, participant_address: &str, external_identity: &str);
}

/// Registry of [`IdentityBindListener`]s with panic-isolating fan-out.
#[derive(Default)]
pub struct IdentityBindListeners {
    listeners: Mutex<Vec<Arc<dyn IdentityBindListener>>>,
}

impl IdentityBindListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn IdentityBindListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    /// Remove a previously added listener, matched by pointer identity.
    pub fn remove(&self, listener: &Arc<dyn IdentityBindListener>) {
        self.listeners
            .lock()
            .unwrap()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Notify every registered listener, in registration order.
    ///
    /// The registry lock is released before any listener runs, so a listener
    /// may add or remove listeners without deadlocking. The committed
    /// authority mutation is never rolled back on listener failure.
    pub fn notify_all(&self, participant_address: &str, external_identity: &str) {
        let snapshot: Vec<Arc<dyn IdentityBindListener>> =
            self.listeners.lock().unwrap().clone();
        for listener in snapshot {
            let result = catch_unwind(AssertUnwindSafe(|| {
                listener.on_user_authenticated(participant_address, external_identity)
            }));
            if result.is_err() {
                error!(
                    "Identity-bind listener panicked for {}",
                    participant_address
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(String, String)>>,
    }

    impl IdentityBindListener for Recorder {
        fn on_user_authenticated(&self, participant_address: &str, external_identity: &str) {
            self.events.lock().unwrap().push((
                participant_address.to_string(),
                external_identity.to_string(),
            ));
        }
    }

    struct Panicker;

    impl IdentityBindListener for Panicker {
        fn on_user_authenticated(&self, _participant_address: &str, _external_identity: &str) {
            panic!("listener failure");
        }
    }

    #[test]
    fn notifies_all_listeners_in_order() {
        let listeners = IdentityBindListeners::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        listeners.add(first.clone());
        listeners.add(second.clone());

        listeners.notify_all("u1@x", "alice@idp");

        assert_eq!(
            first.events.lock().unwrap().as_slice(),
            &[("u1@x".to_string(), "alice@idp".to_string())]
        );
        assert_eq!(
            second.events.lock().unwrap().as_slice(),
            &[("u1@x".to_string(), "alice@idp".to_string())]
        );
    }

    #[test]
    fn panicking_listener_does_not_stop_the_rest() {
        let listeners = IdentityBindListeners::new();
        let survivor = Arc::new(Recorder::default());
        listeners.add(Arc::new(Panicker));
        listeners.add(survivor.clone());

        listeners.notify_all("u1@x", "alice@idp");

        assert_eq!(survivor.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn removed_listener_is_not_notified() {
        let listeners = IdentityBindListeners::new();
        let recorder = Arc::new(Recorder::default());
        let as_dyn: Arc<dyn IdentityBindListener> = recorder.clone();
        listeners.add(as_dyn.clone());
        listeners.remove(&as_dyn);

        listeners.notify_all("u1@x", "alice@idp");

        assert!(recorder.events.lock().unwrap().is_empty());
    }
}
