// ============================================================================
// spark-entities - Change Tracker
// Cached dirty flag with accept semantics and a dedicated "changed" signal
// ============================================================================
//
// The flag starts true: a freshly built entity is "unaccepted", not clean.
// mark() emits changed(true) on every call so each mutation bubbles through
// every ancestor, even ancestors that are already dirty. accept() emits
// changed(false) only when the flag actually flips.
//
// Owners subscribe through a separate upward list that is delivered after
// the ordinary listeners, so an outside observer of a leaf always hears the
// leaf's signal before any ancestor's.
// ============================================================================

use std::cell::Cell;

use tracing::trace;

use crate::events::observers::{Observers, Subscription};

/// Boolean change-tracking capability.
///
/// # Example
///
/// ```
/// use spark_entities::ChangeTracker;
///
/// let tracker = ChangeTracker::new();
/// assert!(tracker.is_changed());
///
/// assert!(tracker.accept());
/// assert!(!tracker.is_changed());
///
/// tracker.mark();
/// assert!(tracker.is_changed());
/// ```
#[derive(Debug)]
pub struct ChangeTracker {
    is_changed: Cell<bool>,
    /// Set while changed(true) is being delivered; a nested mark() on the
    /// same tracker is a feedback loop and is dropped.
    dispatching: Cell<bool>,
    changed: Observers<bool>,
    upward: Observers<bool>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self {
            is_changed: Cell::new(true),
            dispatching: Cell::new(false),
            changed: Observers::new(),
            upward: Observers::new(),
        }
    }

    pub fn is_changed(&self) -> bool {
        self.is_changed.get()
    }

    /// Set the flag and emit `changed(true)`.
    ///
    /// Returns false when the call was suppressed because this tracker is
    /// already dispatching (a cycle in the observation graph).
    pub fn mark(&self) -> bool {
        if self.dispatching.get() {
            trace!("suppressed re-entrant changed signal");
            return false;
        }
        self.is_changed.set(true);

        struct DispatchGuard<'a>(&'a Cell<bool>);

        impl Drop for DispatchGuard<'_> {
            fn drop(&mut self) {
                self.0.set(false);
            }
        }

        self.dispatching.set(true);
        let _guard = DispatchGuard(&self.dispatching);
        self.emit(true);
        true
    }

    /// Clear the flag. Emits `changed(false)` and returns true only if the
    /// flag was set.
    pub fn accept(&self) -> bool {
        if !self.is_changed.replace(false) {
            return false;
        }
        self.emit(false);
        true
    }

    fn emit(&self, was_changed: bool) {
        self.changed.emit(&was_changed);
        self.upward.emit(&was_changed);
    }

    /// Clear the flag without emitting anything. Used after a load, when
    /// nobody outside the graph can be listening yet.
    pub fn settle(&self) {
        self.is_changed.set(false);
    }

    /// Subscribe to the changed signal. The argument is the new flag value.
    pub fn on_changed(&self, listener: impl Fn(bool) + 'static) -> Subscription {
        self.changed.subscribe(move |was_changed: &bool| listener(*was_changed))
    }

    /// Subscribe an owner's bubbling handler, delivered after every
    /// [`on_changed`](Self::on_changed) listener.
    pub(crate) fn on_changed_upward(&self, listener: impl Fn(bool) + 'static) -> Subscription {
        self.upward.subscribe(move |was_changed: &bool| listener(*was_changed))
    }

    pub fn listener_count(&self) -> usize {
        self.changed.len() + self.upward.len()
    }
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}
