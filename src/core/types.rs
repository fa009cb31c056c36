// ============================================================================
// spark-entities - Type Definitions
// Type-erased traits for the entity graph
// ============================================================================
//
// Graph-wide operations (accept, rewire after load, settle) don't need to
// know concrete entity types. Each entity only declares its child slots;
// the provided methods walk them through &dyn Entity / &dyn Slot.
//
// Slots are declared statically per type: there is no reflection, and a
// walk costs O(declared children).
// ============================================================================

use std::rc::Rc;

use super::kit::EntityKit;

// =============================================================================
// ENTITY
// =============================================================================

/// An object participating in the observation graph.
///
/// Implementors provide their [`EntityKit`] and list their child slots;
/// everything else has a default.
///
/// # Example
///
/// ```
/// use spark_entities::{ChildSlot, Entity, EntityKit, Field, Slot};
/// use std::rc::Rc;
///
/// #[derive(Default)]
/// struct Label {
///     kit: EntityKit,
///     text: Field<String>,
/// }
///
/// impl Entity for Label {
///     fn kit(&self) -> &EntityKit {
///         &self.kit
///     }
/// }
///
/// #[derive(Default)]
/// struct Panel {
///     kit: EntityKit,
///     header: ChildSlot<Label>,
/// }
///
/// impl Entity for Panel {
///     fn kit(&self) -> &EntityKit {
///         &self.kit
///     }
///
///     fn slots(&self) -> Vec<&dyn Slot> {
///         vec![&self.header]
///     }
/// }
///
/// let panel = Panel::default();
/// let label = Rc::new(Label::default());
/// panel.header.set(&panel.kit, Some(label.clone()), "header");
///
/// panel.accept_changes();
/// assert!(!panel.is_changed() && !label.is_changed());
///
/// label.kit.set_value(&label.text, "Hi".into(), "text");
/// assert!(panel.is_changed());
/// ```
pub trait Entity: 'static {
    /// The entity's capability bundle.
    fn kit(&self) -> &EntityKit;

    /// Every child slot this entity owns, in declaration order.
    fn slots(&self) -> Vec<&dyn Slot> {
        Vec::new()
    }

    /// Names reported by [`notify_all_properties_changed`](Self::notify_all_properties_changed).
    fn property_names(&self) -> &'static [&'static str] {
        &[]
    }

    fn is_changed(&self) -> bool {
        self.kit().is_changed()
    }

    fn message(&self) -> String {
        self.kit().message()
    }

    /// Accept the whole subtree: every child first, then this entity.
    ///
    /// `changed(false)` fires once per entity whose flag actually flips.
    fn accept_changes(&self) {
        for slot in self.slots() {
            slot.for_each(&mut |child| child.accept_changes());
        }
        self.kit().accept();
    }

    /// Re-run child wiring for the whole subtree.
    ///
    /// Children that arrive through deserialization never pass through a
    /// setter, so they are unsubscribed until this runs.
    fn rewire(&self) {
        let kit = self.kit();
        for slot in self.slots() {
            slot.rewire(kit);
        }
    }

    /// Silently clear flag and message for the whole subtree.
    fn settle(&self) {
        for slot in self.slots() {
            slot.for_each(&mut |child| child.settle());
        }
        self.kit().settle();
    }

    /// Fire property-changed for every declared property name.
    fn notify_all_properties_changed(&self) {
        for name in self.property_names() {
            self.kit().notify(name);
        }
    }

    /// Called with the entity's shared handle before it is rewired, for
    /// types that keep back-references to themselves (tree nodes).
    fn bind_self(_this: &Rc<Self>)
    where
        Self: Sized,
    {
    }
}

// =============================================================================
// SLOT
// =============================================================================

/// A place inside an entity that holds child entities and owns the
/// subscriptions to them.
pub trait Slot {
    /// Visit the current children. Implementations must not hold interior
    /// borrows across the callback.
    fn for_each(&self, f: &mut dyn FnMut(&dyn Entity));

    /// Drop existing subscriptions, rewire each child's own subtree, and
    /// subscribe `owner` to each child again.
    fn rewire(&self, owner: &EntityKit);

    /// Number of children currently held.
    fn child_count(&self) -> usize {
        let mut count = 0;
        self.for_each(&mut |_| count += 1);
        count
    }
}
