//! The single mutable "current location" slot for a browsing session.
//!
//! Writer discipline: explicit user selection always wins; the geolocation
//! bootstrapper may only upgrade a value that is still the system default,
//! and the check happens under the same lock as the write so a selection
//! that lands while geocoding is in flight can never be overwritten.

use std::sync::{Mutex, PoisonError};

use crate::descriptor::LocationDescriptor;

/// How the current location came to be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    /// The system default; nobody has chosen anything yet.
    Default,
    /// The user picked a location explicitly.
    Explicit,
    /// The geolocation bootstrapper upgraded the default.
    Geolocated,
}

#[derive(Debug)]
struct Slot {
    descriptor: LocationDescriptor,
    source: SelectionSource,
}

/// Owns the session's current [`LocationDescriptor`].
#[derive(Debug)]
pub struct SessionState {
    inner: Mutex<Slot>,
}

impl SessionState {
    /// Starts the session at the given system default.
    #[must_use]
    pub fn new(default: LocationDescriptor) -> Self {
        Self {
            inner: Mutex::new(Slot {
                descriptor: default,
                source: SelectionSource::Default,
            }),
        }
    }

    #[must_use]
    pub fn current(&self) -> LocationDescriptor {
        self.lock().descriptor.clone()
    }

    #[must_use]
    pub fn source(&self) -> SelectionSource {
        self.lock().source
    }

    /// Records an explicit user selection. Always wins.
    pub fn select(&self, descriptor: LocationDescriptor) {
        let mut slot = self.lock();
        slot.descriptor = descriptor;
        slot.source = SelectionSource::Explicit;
    }

    /// Resets the slot back to a system default (e.g. "clear my location").
    pub fn reset(&self, default: LocationDescriptor) {
        let mut slot = self.lock();
        slot.descriptor = default;
        slot.source = SelectionSource::Default;
    }

    /// Writes a geolocated descriptor, but only if the slot still holds the
    /// system default. Returns whether the write happened.
    pub fn apply_geolocated(&self, descriptor: LocationDescriptor) -> bool {
        let mut slot = self.lock();
        if slot.source != SelectionSource::Default {
            tracing::debug!(
                current = %slot.descriptor.name,
                "geolocated location discarded; slot no longer holds the default"
            );
            return false;
        }
        slot.descriptor = descriptor;
        slot.source = SelectionSource::Geolocated;
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
