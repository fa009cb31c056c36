// ============================================================================
// spark-entities - Child Slots
// The property setter protocol for entity-valued properties
// ============================================================================
//
// A ChildSlot holds an optional shared child plus the owner's subscriptions
// to it. Reassigning the slot always runs, in order:
//
//   1. identity check (same child or both empty: no-op, return false)
//   2. drop the old wiring (unsubscribe changed + message handlers)
//   3. store the new child
//   4. wire the new child, if any
//   5. property-changed(name) on the owner
//   6. mark the owner changed
//
// No borrow is held while notifications run, so listeners may read the
// slot. Embedded<C> is the by-value variant used for owned collections.
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

use crate::core::kit::{EntityKit, Wiring};
use crate::core::types::{Entity, Slot};
use crate::events::equality::same_slot;

// =============================================================================
// CHILD SLOT
// =============================================================================

/// An entity-valued property.
///
/// The same child may sit in several slots (fan-in); each slot keeps its
/// own subscription, so the child's changes bubble to every owner. Moving a
/// child from one owner to another means clearing the old slot explicitly.
///
/// # Example
///
/// ```
/// use spark_entities::{ChildSlot, Entity, EntityKit};
/// use std::rc::Rc;
///
/// #[derive(Default)]
/// struct Leaf {
///     kit: EntityKit,
/// }
///
/// impl Entity for Leaf {
///     fn kit(&self) -> &EntityKit {
///         &self.kit
///     }
/// }
///
/// let owner = EntityKit::new();
/// let slot: ChildSlot<Leaf> = ChildSlot::new();
/// let first = Rc::new(Leaf::default());
/// let second = Rc::new(Leaf::default());
///
/// assert!(slot.set(&owner, Some(first.clone()), "leaf"));
/// assert!(!slot.set(&owner, Some(first.clone()), "leaf"));
/// assert!(slot.set(&owner, Some(second), "leaf"));
///
/// // the first leaf is detached now
/// first.kit.set_message("unheard");
/// assert_eq!(owner.message(), "");
/// ```
pub struct ChildSlot<C> {
    child: RefCell<Option<Rc<C>>>,
    wiring: RefCell<Wiring>,
}

impl<C> ChildSlot<C> {
    /// An empty slot.
    pub fn new() -> Self {
        Self {
            child: RefCell::new(None),
            wiring: RefCell::new(Wiring::default()),
        }
    }

    pub fn get(&self) -> Option<Rc<C>> {
        self.child.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.child.borrow().is_none()
    }

    /// True while the owner is subscribed to the current child.
    pub fn is_wired(&self) -> bool {
        !self.wiring.borrow().is_empty()
    }
}

impl<C: Entity> ChildSlot<C> {
    /// A slot that starts out holding `child`, already wired to `owner`.
    pub fn with_child(owner: &EntityKit, child: Rc<C>) -> Self {
        let wiring = owner.wire(child.kit());
        Self {
            child: RefCell::new(Some(child)),
            wiring: RefCell::new(wiring),
        }
    }

    /// Assign the slot. Returns false when `value` is the current child.
    pub fn set(&self, owner: &EntityKit, value: Option<Rc<C>>, name: &str) -> bool {
        if same_slot(&*self.child.borrow(), &value) {
            return false;
        }

        self.wiring.take().release();
        let previous = self.child.replace(value);
        if let Some(child) = self.get() {
            self.wiring.replace(owner.wire(child.kit()));
        }

        trace!(
            property = name,
            attached = !self.is_empty(),
            detached = previous.is_some(),
            "child slot reassigned"
        );

        owner.notify(name);
        owner.mark_changed();
        true
    }

    /// Empty the slot, returning the detached child.
    pub fn take(&self, owner: &EntityKit, name: &str) -> Option<Rc<C>> {
        let current = self.get();
        if current.is_some() {
            self.set(owner, None, name);
        }
        current
    }
}

impl<C: Entity> Slot for ChildSlot<C> {
    fn for_each(&self, f: &mut dyn FnMut(&dyn Entity)) {
        if let Some(child) = self.get() {
            f(&*child);
        }
    }

    fn rewire(&self, owner: &EntityKit) {
        self.wiring.take().release();
        if let Some(child) = self.get() {
            C::bind_self(&child);
            child.rewire();
            self.wiring.replace(owner.wire(child.kit()));
        }
    }
}

impl<C> Default for ChildSlot<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: fmt::Debug> fmt::Debug for ChildSlot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSlot")
            .field("child", &self.child.borrow())
            .field("wired", &self.is_wired())
            .finish()
    }
}

impl<C: Serialize> Serialize for ChildSlot<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.child.borrow().as_deref().serialize(serializer)
    }
}

impl<'de, C: Deserialize<'de>> Deserialize<'de> for ChildSlot<C> {
    /// Deserialized slots are unwired until the owner is rewired.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let child = Option::<C>::deserialize(deserializer)?;
        Ok(Self {
            child: RefCell::new(child.map(Rc::new)),
            wiring: RefCell::new(Wiring::default()),
        })
    }
}

// =============================================================================
// EMBEDDED
// =============================================================================

/// A child entity owned by value, such as an entity's item collection.
///
/// The child cannot be reassigned, only mutated; the owner stays subscribed
/// to it for the owner's whole lifetime.
pub struct Embedded<C> {
    value: C,
    wiring: RefCell<Wiring>,
}

impl<C: Entity> Embedded<C> {
    pub fn new(owner: &EntityKit, value: C) -> Self {
        let wiring = owner.wire(value.kit());
        Self {
            value,
            wiring: RefCell::new(wiring),
        }
    }

    pub fn get(&self) -> &C {
        &self.value
    }

    pub fn is_wired(&self) -> bool {
        !self.wiring.borrow().is_empty()
    }
}

impl<C> Deref for Embedded<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.value
    }
}

impl<C: Entity> Slot for Embedded<C> {
    fn for_each(&self, f: &mut dyn FnMut(&dyn Entity)) {
        f(&self.value);
    }

    fn rewire(&self, owner: &EntityKit) {
        self.wiring.take().release();
        self.value.rewire();
        self.wiring.replace(owner.wire(self.value.kit()));
    }
}

impl<C: fmt::Debug> fmt::Debug for Embedded<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}

impl<C: Serialize> Serialize for Embedded<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, C: Deserialize<'de>> Deserialize<'de> for Embedded<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self {
            value: C::deserialize(deserializer)?,
            wiring: RefCell::new(Wiring::default()),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
