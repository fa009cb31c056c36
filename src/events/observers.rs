// ============================================================================
// spark-entities - Observer Lists
// Multicast listener lists with disposable subscription handles
// ============================================================================
//
// Every signal in the entity graph (property-changed, changed, message raised,
// collection changed) is an Observers<E>. Subscribing returns a Subscription;
// dropping the handle removes the listener. Owners keep the handles for their
// children inside the slot that holds the child, so replacing the child
// releases the old subscription automatically.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Listener callback type. `E` may be unsized (`str`, for instance).
pub type Listener<E> = Rc<dyn Fn(&E)>;

struct ObserverSet<E: ?Sized> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Listener<E>)>>,
}

impl<E: ?Sized> ObserverSet<E> {
    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }
}

// =============================================================================
// OBSERVERS<E>
// =============================================================================

/// An ordered list of listeners for events of type `E`.
///
/// Dispatch is synchronous and in subscription order. The list is
/// snapshotted before dispatch, so only listeners present when `emit`
/// starts are called, and listeners may subscribe, unsubscribe, or emit
/// again from inside a callback.
///
/// # Example
///
/// ```
/// use spark_entities::Observers;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let observers: Observers<i32> = Observers::new();
/// let seen = Rc::new(Cell::new(0));
///
/// let seen_clone = seen.clone();
/// let sub = observers.subscribe(move |v| seen_clone.set(*v));
///
/// observers.emit(&7);
/// assert_eq!(seen.get(), 7);
///
/// drop(sub);
/// observers.emit(&9);
/// assert_eq!(seen.get(), 7);
/// ```
pub struct Observers<E: ?Sized + 'static> {
    set: Rc<ObserverSet<E>>,
}

impl<E: ?Sized + 'static> Observers<E> {
    /// Create an empty observer list.
    pub fn new() -> Self {
        Self {
            set: Rc::new(ObserverSet {
                next_id: Cell::new(0),
                entries: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register a listener. The listener stays registered until the
    /// returned handle is dropped or unsubscribed.
    pub fn subscribe(&self, listener: impl Fn(&E) + 'static) -> Subscription {
        let id = self.set.next_id.get();
        self.set.next_id.set(id + 1);
        self.set
            .entries
            .borrow_mut()
            .push((id, Rc::new(listener) as Listener<E>));

        let weak: Weak<ObserverSet<E>> = Rc::downgrade(&self.set);
        Subscription {
            release: Some(Box::new(move || {
                if let Some(set) = weak.upgrade() {
                    set.remove(id);
                }
            })),
        }
    }

    /// Deliver `event` to every listener registered at this moment.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .set
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.set.entries.borrow().len()
    }

    /// True when nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: ?Sized + 'static> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized + 'static> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.len())
            .finish()
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Handle for a registered listener. Dropping it unsubscribes.
///
/// The handle only holds a weak reference to the observer list, so it never
/// keeps the source alive; releasing after the source is gone is a no-op.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Keep the listener registered for as long as the source lives.
    pub fn forget(mut self) {
        self.release = None;
    }

    /// False once the handle has been forgotten.
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
