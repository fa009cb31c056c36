// ============================================================================
// spark-entities - Ergonomic Macros
// ============================================================================

/// Clone handles into a `move` closure.
///
/// Observers are `'static` closures, so counters and shared state usually
/// need an `Rc` clone per subscription.
///
/// # Usage
///
/// ```rust
/// use spark_entities::{cloned, EntityKit};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let kit = EntityKit::new();
/// let hits = Rc::new(Cell::new(0));
///
/// let _sub = kit.on_property_changed(None, cloned!(hits => move |_| hits.set(hits.get() + 1)));
/// kit.notify("title");
/// assert_eq!(hits.get(), 1);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Build the `Vec<&dyn Slot>` returned from [`Entity::slots`](crate::Entity::slots).
///
/// # Usage
///
/// ```rust
/// use spark_entities::{slots, ChildSlot, Entity, EntityKit, Slot};
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
/// #[derive(Default)]
/// struct Pair {
///     kit: EntityKit,
///     left: ChildSlot<Leaf>,
///     right: ChildSlot<Leaf>,
/// }
///
/// impl Entity for Pair {
///     fn kit(&self) -> &EntityKit {
///         &self.kit
///     }
///
///     fn slots(&self) -> Vec<&dyn Slot> {
///         slots![self.left, self.right]
///     }
/// }
///
/// assert_eq!(Pair::default().slots().len(), 2);
/// ```
#[macro_export]
macro_rules! slots {
    ($($slot:expr),* $(,)?) => {
        vec![$( &$slot as &dyn $crate::Slot ),*]
    };
}
