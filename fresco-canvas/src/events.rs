//! Notifications about the local user's standing.
//!
//! The filter announces transitions synchronously while it processes
//! a message. Observers must return quickly and must not call back
//! into the filter.

use std::sync::{Arc, Mutex};

/// A transition in the local user's permissions.
///
/// Carried value is the new state. Apart from the unconditional
/// unlock announcement during a reset, observers only hear about
/// actual changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclChange {
    /// The local user's combined lock state (session lock or
    /// self lock) flipped.
    LocalLockChanged(bool),
    /// The local user gained or lost operator status.
    LocalOpChanged(bool),
    /// Layer structure changes became restricted or open.
    LayerControlLockChanged(bool),
    /// Own-layer mode was toggled.
    OwnLayersChanged(bool),
}

/// Callback signature stored by the filter.
pub type AclObserver = Box<dyn FnMut(AclChange) + Send>;

/// Buffers changes for callers that poll instead of reacting inline,
/// such as a UI that refreshes once per frame.
#[derive(Clone, Default)]
pub struct ChangeRecorder {
    changes: Arc<Mutex<Vec<AclChange>>>,
}

impl ChangeRecorder {
    pub fn new() -> ChangeRecorder {
        ChangeRecorder::default()
    }

    /// An observer that appends every change to this recorder.
    pub fn hook(&self) -> AclObserver {
        let changes = Arc::clone(&self.changes);
        Box::new(move |change| changes.lock().unwrap().push(change))
    }

    /// Drains the buffered changes in arrival order.
    pub fn take(&self) -> Vec<AclChange> {
        std::mem::take(&mut *self.changes.lock().unwrap())
    }
}

// ===================================================================
// Tests
// ===================================================================
