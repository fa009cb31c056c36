// ============================================================================
// spark-entities - Entity Kit
// The shared core every entity embeds: notifier + optional tracker/messenger
// ============================================================================
//
// An EntityKit is a cheap handle (Rc) to the capabilities of one entity.
// Concrete entity types embed a kit instead of inheriting from a base class,
// and pick their capabilities with KitBuilder:
//
//   notify-only        KitBuilder::new().build()
//   tracking-only      KitBuilder::new().tracking().build()
//   messaging-only     KitBuilder::new().messaging().build()
//   full composite     EntityKit::new()
//
// Bubbling handlers installed by wire() only hold a Weak reference to the
// owning kit, so a child never keeps its parent alive.
// ============================================================================

use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::capabilities::{ChangeTracker, MessageBroadcaster, PropertyNotifier};
use crate::events::equality::{EqualsFn, equals};
use crate::events::observers::Subscription;
use crate::primitives::field::Field;

struct KitInner {
    notifier: PropertyNotifier,
    tracker: Option<ChangeTracker>,
    messenger: Option<MessageBroadcaster>,
}

// =============================================================================
// KIT BUILDER
// =============================================================================

/// Selects which capabilities an entity carries. Property notification is
/// always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KitBuilder {
    tracking: bool,
    messaging: bool,
}

impl KitBuilder {
    /// A notify-only configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the change-tracking capability.
    pub fn tracking(mut self) -> Self {
        self.tracking = true;
        self
    }

    /// Add the message-bubbling capability.
    pub fn messaging(mut self) -> Self {
        self.messaging = true;
        self
    }

    pub fn build(self) -> EntityKit {
        EntityKit {
            inner: Rc::new(KitInner {
                notifier: PropertyNotifier::new(),
                tracker: self.tracking.then(ChangeTracker::new),
                messenger: self.messaging.then(MessageBroadcaster::new),
            }),
        }
    }
}

// =============================================================================
// ENTITY KIT
// =============================================================================

/// Capability bundle of a single entity.
///
/// # Example
///
/// ```
/// use spark_entities::{EntityKit, Field};
///
/// let kit = EntityKit::new();
/// let title = Field::new(String::from("draft"));
///
/// kit.accept();
/// assert!(!kit.is_changed());
///
/// assert!(kit.set_value(&title, "final".to_string(), "title"));
/// assert!(kit.is_changed());
///
/// // same value: no side effects
/// assert!(!kit.set_value(&title, "final".to_string(), "title"));
/// ```
#[derive(Clone)]
pub struct EntityKit {
    inner: Rc<KitInner>,
}

impl EntityKit {
    /// The full composite: notification, change tracking and messaging.
    pub fn new() -> Self {
        KitBuilder::new().tracking().messaging().build()
    }

    pub fn builder() -> KitBuilder {
        KitBuilder::new()
    }

    pub fn notifier(&self) -> &PropertyNotifier {
        &self.inner.notifier
    }

    pub fn tracker(&self) -> Option<&ChangeTracker> {
        self.inner.tracker.as_ref()
    }

    pub fn messenger(&self) -> Option<&MessageBroadcaster> {
        self.inner.messenger.as_ref()
    }

    /// True when both handles refer to the same entity core.
    pub fn ptr_eq(&self, other: &EntityKit) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // STATE
    // =========================================================================

    /// Dirty flag. Always false for kits without change tracking.
    pub fn is_changed(&self) -> bool {
        self.inner.is_changed()
    }

    /// Current message. Always empty for kits without messaging.
    pub fn message(&self) -> String {
        self.messenger()
            .map(MessageBroadcaster::message)
            .unwrap_or_default()
    }

    /// Mark this entity changed and bubble `changed(true)` to observers.
    pub fn mark_changed(&self) {
        self.inner.mark_changed();
    }

    /// Clear this entity's own flag. Children are the caller's business;
    /// see [`Entity::accept_changes`](crate::Entity::accept_changes) for the
    /// whole-subtree operation.
    pub fn accept(&self) -> bool {
        self.tracker().is_some_and(ChangeTracker::accept)
    }

    /// Replace the message, raising it when it differs.
    pub fn set_message(&self, message: &str) -> bool {
        self.inner.set_message(message)
    }

    /// Silently reset flag and message. Used after deserialization.
    pub fn settle(&self) {
        if let Some(tracker) = self.tracker() {
            tracker.settle();
        }
        if let Some(messenger) = self.messenger() {
            messenger.settle();
        }
    }

    pub fn notify(&self, name: &str) {
        self.inner.notifier.notify(name);
    }

    // =========================================================================
    // SETTERS
    // =========================================================================

    /// Plain value setter: compare, assign, mark changed, notify `name`.
    ///
    /// Returns false without side effects when the value is equal.
    pub fn set_value<T: PartialEq>(&self, field: &Field<T>, value: T, name: &str) -> bool {
        self.set_value_with(field, value, name, equals)
    }

    /// Like [`set_value`](Self::set_value) with an explicit equality.
    pub fn set_value_with<T>(
        &self,
        field: &Field<T>,
        value: T,
        name: &str,
        eq: EqualsFn<T>,
    ) -> bool {
        if field.with(|current| eq(current, &value)) {
            return false;
        }
        let _previous = field.replace(value);
        self.mark_changed();
        self.notify(name);
        true
    }

    // =========================================================================
    // OBSERVATION
    // =========================================================================

    /// Subscribe to property-changed, filtered to `name` unless `None`.
    pub fn on_property_changed(
        &self,
        name: Option<&str>,
        listener: impl Fn(&str) + 'static,
    ) -> Subscription {
        self.inner.notifier.subscribe(name, listener)
    }

    /// Subscribe to the changed signal. `None` without change tracking.
    pub fn on_changed(&self, listener: impl Fn(bool) + 'static) -> Option<Subscription> {
        self.tracker().map(|tracker| tracker.on_changed(listener))
    }

    /// Subscribe to message raised. `None` without messaging.
    pub fn on_message(&self, listener: impl Fn(&str) + 'static) -> Option<Subscription> {
        self.messenger()
            .map(|messenger| messenger.on_message(listener))
    }

    // =========================================================================
    // WIRING
    // =========================================================================

    /// Subscribe this kit's bubbling handlers to `child`.
    ///
    /// A child `changed(true)` marks this entity changed; `changed(false)` is
    /// ignored. A child message becomes this entity's message. Only signals
    /// the child actually exposes are subscribed. Dropping the returned
    /// [`Wiring`] unsubscribes both handlers.
    pub fn wire(&self, child: &EntityKit) -> Wiring {
        let changed = child.tracker().map(|tracker| {
            let owner: Weak<KitInner> = Rc::downgrade(&self.inner);
            tracker.on_changed_upward(move |was_changed| {
                if !was_changed {
                    return;
                }
                if let Some(owner) = owner.upgrade() {
                    owner.mark_changed();
                }
            })
        });

        let message = child.messenger().map(|messenger| {
            let owner: Weak<KitInner> = Rc::downgrade(&self.inner);
            messenger.on_message_upward(move |message| {
                if let Some(owner) = owner.upgrade() {
                    owner.set_message(message);
                }
            })
        });

        trace!(
            changed = changed.is_some(),
            message = message.is_some(),
            "wired child entity"
        );
        Wiring { changed, message }
    }
}

impl KitInner {
    fn is_changed(&self) -> bool {
        self.tracker.as_ref().is_some_and(ChangeTracker::is_changed)
    }

    fn mark_changed(&self) {
        if let Some(tracker) = &self.tracker {
            tracker.mark();
        }
    }

    fn set_message(&self, message: &str) -> bool {
        self.messenger
            .as_ref()
            .is_some_and(|messenger| messenger.set(message))
    }
}

impl Default for EntityKit {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntityKit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityKit")
            .field("is_changed", &self.is_changed())
            .field("message", &self.message())
            .field("tracking", &self.tracker().is_some())
            .field("messaging", &self.messenger().is_some())
            .finish()
    }
}

// =============================================================================
// WIRING
// =============================================================================

/// The pair of bubbling subscriptions an owner holds on one child.
#[derive(Debug, Default)]
pub struct Wiring {
    changed: Option<Subscription>,
    message: Option<Subscription>,
}

impl Wiring {
    /// True when nothing is subscribed (empty slot or unwired child).
    pub fn is_empty(&self) -> bool {
        self.changed.is_none() && self.message.is_none()
    }

    /// Unsubscribe both handlers now. Dropping the wiring does the same.
    pub fn release(self) {
        let Wiring { changed, message } = self;
        if changed.is_none() && message.is_none() {
            return;
        }
        if let Some(sub) = changed {
            sub.unsubscribe();
        }
        if let Some(sub) = message {
            sub.unsubscribe();
        }
        trace!("released child wiring");
    }
}

// =============================================================================
// TESTS
// =============================================================================
