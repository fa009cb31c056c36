// ============================================================================
// spark-entities - ObservingCollection
// An ordered sequence of entities that bubbles their changes and messages
// ============================================================================
//
// Mirrors the child-slot protocol for collection mutations:
//
// - an item entering the collection is wired to the collection's kit
// - an item whose last occurrence leaves is unwired before the mutation
//   returns
// - every structural mutation marks the collection changed, even when the
//   net content is unchanged (remove then re-add the same item)
//
// Duplicates are allowed, but the collection subscribes to each distinct
// item once, so one mutation of a repeated item bubbles once.
//
// Three signals fire on a structural mutation, in this order:
//   changed(true), property-changed("items") (+ "count" when the length
//   moved), and a CollectionChange describing the mutation.
// ============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

use crate::core::kit::{EntityKit, Wiring};
use crate::core::types::{Entity, Slot};
use crate::events::observers::{Observers, Subscription};

/// Describes one structural mutation of an [`ObservingCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionChange {
    Added { index: usize },
    Removed { index: usize },
    Replaced { index: usize },
    Cleared { count: usize },
}

/// The owner's subscription to one distinct item.
struct Wired {
    occurrences: usize,
    wiring: Wiring,
}

/// The collection's items together with its subscriptions to them.
///
/// `wired` is keyed by item address. Every key refers to an item still
/// held in `items`, so an address cannot be reused while it is a key.
struct ItemList<T> {
    items: RefCell<Vec<Rc<T>>>,
    wired: RefCell<HashMap<*const T, Wired>>,
}

impl<T> ItemList<T> {
    fn from_vec(items: Vec<Rc<T>>) -> Self {
        Self {
            items: RefCell::new(items),
            wired: RefCell::new(HashMap::new()),
        }
    }

    fn snapshot(&self) -> Vec<Rc<T>> {
        self.items.borrow().clone()
    }

    /// Drop one occurrence of `item`; unwires it when it was the last.
    fn release(&self, item: &Rc<T>) {
        let key = Rc::as_ptr(item);
        let gone = {
            let mut wired = self.wired.borrow_mut();
            match wired.get_mut(&key) {
                Some(entry) if entry.occurrences > 1 => {
                    entry.occurrences -= 1;
                    None
                }
                Some(_) => wired.remove(&key),
                None => None,
            }
        };
        if let Some(entry) = gone {
            entry.wiring.release();
        }
    }

    /// Unwire every item at once.
    fn release_all(&self) {
        let wired: Vec<Wired> = self.wired.borrow_mut().drain().map(|(_, w)| w).collect();
        for entry in wired {
            entry.wiring.release();
        }
    }

    fn wired_count(&self) -> usize {
        self.wired.borrow().len()
    }
}

impl<T: Entity> ItemList<T> {
    /// Count one more occurrence of `item`, wiring it on its first.
    fn acquire(&self, owner: &EntityKit, item: &Rc<T>) {
        let key = Rc::as_ptr(item);
        if let Some(entry) = self.wired.borrow_mut().get_mut(&key) {
            entry.occurrences += 1;
            return;
        }
        let wiring = owner.wire(item.kit());
        self.wired.borrow_mut().insert(
            key,
            Wired {
                occurrences: 1,
                wiring,
            },
        );
    }
}

impl<T: Entity> Slot for ItemList<T> {
    fn for_each(&self, f: &mut dyn FnMut(&dyn Entity)) {
        for item in self.snapshot() {
            f(&*item);
        }
    }

    fn rewire(&self, owner: &EntityKit) {
        self.release_all();
        let items = self.snapshot();
        for item in &items {
            if !self.wired.borrow().contains_key(&Rc::as_ptr(item)) {
                T::bind_self(item);
                item.rewire();
            }
            self.acquire(owner, item);
        }
        trace!(
            items = items.len(),
            distinct = self.wired_count(),
            "rewired collection items"
        );
    }

    fn child_count(&self) -> usize {
        self.items.borrow().len()
    }
}

// =============================================================================
// OBSERVING COLLECTION
// =============================================================================

/// An ordered, mutable sequence of shared entities.
///
/// Duplicates are allowed and the collection holds one subscription per
/// distinct item. Lookups by handle ([`contains`](Self::contains),
/// [`remove`](Self::remove)) use identity; [`find`](Self::find) uses value
/// equality.
///
/// # Example
///
/// ```
/// use spark_entities::{Entity, EntityKit, ObservingCollection};
/// use std::rc::Rc;
///
/// #[derive(Default)]
/// struct Task {
///     kit: EntityKit,
/// }
///
/// impl Entity for Task {
///     fn kit(&self) -> &EntityKit {
///         &self.kit
///     }
/// }
///
/// let tasks = ObservingCollection::new();
/// let task = Rc::new(Task::default());
/// tasks.push(task.clone());
///
/// task.kit.set_message("m");
/// assert_eq!(tasks.message(), "m");
///
/// assert!(tasks.remove(&task));
/// task.kit.set_message("n");
/// assert_eq!(tasks.message(), "m");
/// ```
pub struct ObservingCollection<T> {
    kit: EntityKit,
    items: ItemList<T>,
    structure: Observers<CollectionChange>,
}

impl<T: Entity> ObservingCollection<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::with_list(ItemList::from_vec(Vec::new()))
    }

    fn with_list(items: ItemList<T>) -> Self {
        Self {
            kit: EntityKit::new(),
            items,
            structure: Observers::new(),
        }
    }

    /// Create a collection holding `items`, each wired on the way in.
    pub fn from_items<I: IntoIterator<Item = Rc<T>>>(items: I) -> Self {
        let collection = Self::with_list(ItemList::from_vec(items.into_iter().collect()));
        for item in collection.items.snapshot() {
            collection.items.acquire(&collection.kit, &item);
        }
        collection
    }

    fn structure_changed(&self, change: CollectionChange, length_moved: bool) {
        trace!(?change, "collection structure changed");
        self.kit.mark_changed();
        self.kit.notify("items");
        if length_moved {
            self.kit.notify("count");
        }
        self.structure.emit(&change);
    }

    // =========================================================================
    // READ
    // =========================================================================

    pub fn len(&self) -> usize {
        self.items.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Rc<T>> {
        self.items.items.borrow().get(index).cloned()
    }

    pub fn first(&self) -> Option<Rc<T>> {
        self.get(0)
    }

    pub fn last(&self) -> Option<Rc<T>> {
        self.items.items.borrow().last().cloned()
    }

    /// The items at this moment. Mutating the collection while iterating is
    /// fine; the iterator does not observe it.
    pub fn iter(&self) -> std::vec::IntoIter<Rc<T>> {
        self.items.snapshot().into_iter()
    }

    pub fn to_vec(&self) -> Vec<Rc<T>> {
        self.items.snapshot()
    }

    /// True when this exact handle is in the collection.
    pub fn contains(&self, item: &Rc<T>) -> bool {
        self.position(item).is_some()
    }

    /// Index of the first occurrence of this exact handle.
    pub fn position(&self, item: &Rc<T>) -> Option<usize> {
        self.items
            .items
            .borrow()
            .iter()
            .position(|held| Rc::ptr_eq(held, item))
    }

    /// First item equal in value to `value`.
    pub fn find(&self, value: &T) -> Option<Rc<T>>
    where
        T: PartialEq,
    {
        self.items
            .items
            .borrow()
            .iter()
            .find(|held| ***held == *value)
            .cloned()
    }

    // =========================================================================
    // MUTATE
    // =========================================================================

    /// Append an item.
    pub fn push(&self, item: Rc<T>) {
        self.items.acquire(&self.kit, &item);
        let index = {
            let mut items = self.items.items.borrow_mut();
            items.push(item);
            items.len() - 1
        };
        self.structure_changed(CollectionChange::Added { index }, true);
    }

    /// Alias for [`push`](Self::push).
    pub fn add(&self, item: Rc<T>) {
        self.push(item);
    }

    /// Insert at `index`, shifting later items right. Returns false, with
    /// no side effects, when `index > len`.
    pub fn insert(&self, index: usize, item: Rc<T>) -> bool {
        if index > self.len() {
            trace!(index, len = self.len(), "insert index out of range");
            return false;
        }
        self.items.acquire(&self.kit, &item);
        self.items.items.borrow_mut().insert(index, item);
        self.structure_changed(CollectionChange::Added { index }, true);
        true
    }

    /// Remove the first occurrence of this exact handle.
    pub fn remove(&self, item: &Rc<T>) -> bool {
        match self.position(item) {
            Some(index) => self.remove_at(index).is_some(),
            None => false,
        }
    }

    /// Remove the item at `index`, if there is one.
    pub fn remove_at(&self, index: usize) -> Option<Rc<T>> {
        let item = {
            let mut items = self.items.items.borrow_mut();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        self.items.release(&item);
        self.structure_changed(CollectionChange::Removed { index }, true);
        Some(item)
    }

    /// Put `item` at `index`, returning the item it displaced. Nothing
    /// happens when `index` is out of range.
    pub fn replace(&self, index: usize, item: Rc<T>) -> Option<Rc<T>> {
        if index >= self.len() {
            return None;
        }
        let old = self.items.items.borrow()[index].clone();
        self.items.release(&old);
        self.items.items.borrow_mut()[index] = item.clone();
        self.items.acquire(&self.kit, &item);

        self.structure_changed(CollectionChange::Replaced { index }, false);
        Some(old)
    }

    /// Remove every item. Marks the collection changed even when it was
    /// already empty.
    pub fn clear(&self) {
        let removed: Vec<Rc<T>> = self.items.items.borrow_mut().drain(..).collect();
        self.items.release_all();
        let count = removed.len();
        self.structure_changed(CollectionChange::Cleared { count }, count > 0);
    }

    // =========================================================================
    // OBSERVE
    // =========================================================================

    /// Subscribe to structural mutations.
    pub fn on_collection_changed(
        &self,
        listener: impl Fn(&CollectionChange) + 'static,
    ) -> Subscription {
        self.structure.subscribe(listener)
    }
}

impl<T: Entity> Entity for ObservingCollection<T> {
    fn kit(&self) -> &EntityKit {
        &self.kit
    }

    fn slots(&self) -> Vec<&dyn Slot> {
        vec![&self.items]
    }

    fn property_names(&self) -> &'static [&'static str] {
        &["items", "count"]
    }
}

impl<T: Entity> Default for ObservingCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> FromIterator<Rc<T>> for ObservingCollection<T> {
    fn from_iter<I: IntoIterator<Item = Rc<T>>>(iter: I) -> Self {
        Self::from_items(iter)
    }
}

impl<T: Entity> IntoIterator for &ObservingCollection<T> {
    type Item = Rc<T>;
    type IntoIter = std::vec::IntoIter<Rc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservingCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservingCollection")
            .field("items", &*self.items.items.borrow())
            .field("is_changed", &self.kit.is_changed())
            .field("message", &self.kit.message())
            .finish()
    }
}

impl<T: Serialize> Serialize for ObservingCollection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let items = self.items.items.borrow();
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items.iter() {
            seq.serialize_element(&**item)?;
        }
        seq.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ObservingCollection<T> {
    /// Items arrive unwired; the post-load rewire subscribes them.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Ok(Self {
            kit: EntityKit::new(),
            items: ItemList::from_vec(items.into_iter().map(Rc::new).collect()),
            structure: Observers::new(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default, Serialize, Deserialize)]
    struct Task {
        #[serde(skip)]
        kit: EntityKit,
        title: String,
    }

    impl PartialEq for Task {
        fn eq(&self, other: &Self) -> bool {
            self.title == other.title
        }
    }

    impl Entity for Task {
        fn kit(&self) -> &EntityKit {
            &self.kit
        }
    }

    fn task(title: &str) -> Rc<Task> {
        Rc::new(Task {
            kit: EntityKit::new(),
            title: title.to_string(),
        })
    }

    fn listeners(item: &Task) -> usize {
        item.kit.messenger().map_or(0, |m| m.listener_count())
    }

    #[test]
    fn new_collection_is_changed_and_silent() {
        let tasks: ObservingCollection<Task> = ObservingCollection::new();
        assert!(tasks.is_changed());
        assert_eq!(tasks.message(), "");
        assert!(tasks.is_empty());
    }

    #[test]
    fn push_wires_and_remove_unwires() {
        let tasks = ObservingCollection::new();
        let a = task("a");

        tasks.push(a.clone());
        assert_eq!(listeners(&a), 1);

        a.kit.set_message("m");
        assert_eq!(tasks.message(), "m");

        assert!(tasks.remove(&a));
        assert_eq!(listeners(&a), 0);

        a.kit.set_message("n");
        assert_eq!(tasks.message(), "m");
        assert!(!tasks.remove(&a));
    }

    #[test]
    fn structural_mutation_always_marks_changed() {
        let tasks = ObservingCollection::new();
        let a = task("a");
        tasks.push(a.clone());
        tasks.accept_changes();
        assert!(!tasks.is_changed());

        tasks.remove(&a);
        tasks.push(a.clone());
        assert!(tasks.is_changed());

        tasks.accept_changes();
        tasks.clear();
        tasks.clear();
        assert!(tasks.is_changed());
    }

    #[test]
    fn item_change_bubbles_to_collection() {
        let tasks = ObservingCollection::from_items(vec![task("a"), task("b")]);
        tasks.accept_changes();
        assert!(!tasks.is_changed());
        assert!(tasks.iter().all(|t| !t.is_changed()));

        tasks.get(1).unwrap().kit.mark_changed();
        assert!(tasks.is_changed());
    }

    #[test]
    fn accept_clears_items_then_self() {
        let tasks = ObservingCollection::from_items(vec![task("a")]);
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = order.clone();
        let _item = tasks.get(0).unwrap().kit.on_changed(move |_| o.borrow_mut().push("item"));
        let o = order.clone();
        let _coll = tasks.kit().on_changed(move |_| o.borrow_mut().push("collection"));

        tasks.accept_changes();
        assert_eq!(*order.borrow(), vec!["item", "collection"]);
    }

    #[test]
    fn events_fire_in_documented_order() {
        let tasks = ObservingCollection::new();
        tasks.accept_changes();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        let _c = tasks.kit().on_changed(move |v| l.borrow_mut().push(format!("changed:{v}")));
        let l = log.clone();
        let _p = tasks
            .kit()
            .on_property_changed(None, move |n| l.borrow_mut().push(n.to_string()));
        let l = log.clone();
        let _s = tasks.on_collection_changed(move |c| l.borrow_mut().push(format!("{c:?}")));

        tasks.push(task("a"));
        assert_eq!(
            *log.borrow(),
            vec!["changed:true", "items", "count", "Added { index: 0 }"]
        );
    }

    #[test]
    fn replace_swaps_subscriptions() {
        let tasks = ObservingCollection::new();
        let a = task("a");
        let b = task("b");
        tasks.push(a.clone());

        let old = tasks.replace(0, b.clone());
        assert!(old.is_some_and(|o| Rc::ptr_eq(&o, &a)));
        assert_eq!(listeners(&a), 0);
        assert_eq!(listeners(&b), 1);

        assert!(tasks.replace(5, task("c")).is_none());
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn duplicates_share_one_subscription() {
        let tasks = ObservingCollection::new();
        let a = task("a");
        tasks.push(a.clone());
        tasks.push(a.clone());
        assert_eq!(tasks.len(), 2);
        assert_eq!(listeners(&a), 1);

        tasks.accept_changes();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let _sub = tasks.kit().on_changed(move |v| {
            if v {
                h.set(h.get() + 1);
            }
        });
        a.kit.mark_changed();
        assert_eq!(hits.get(), 1);

        // the subscription outlives all but the last occurrence
        tasks.remove(&a);
        assert_eq!(listeners(&a), 1);
        assert_eq!(tasks.len(), 1);
        tasks.remove(&a);
        assert_eq!(listeners(&a), 0);
    }

    #[test]
    fn replacing_one_duplicate_keeps_the_other_wired() {
        let tasks = ObservingCollection::new();
        let a = task("a");
        tasks.push(a.clone());
        tasks.push(a.clone());

        tasks.replace(0, task("b"));
        assert_eq!(listeners(&a), 1);

        a.kit.set_message("still heard");
        assert_eq!(tasks.message(), "still heard");
    }

    #[test]
    fn insert_out_of_range_is_rejected() {
        let tasks = ObservingCollection::new();
        tasks.accept_changes();
        let a = task("a");

        assert!(!tasks.insert(3, a.clone()));
        assert!(tasks.is_empty());
        assert!(!tasks.is_changed());
        assert_eq!(listeners(&a), 0);

        assert!(tasks.insert(0, a.clone()));
        assert!(tasks.insert(1, task("b")));
        assert!(tasks.insert(1, task("c")));
        let titles: Vec<String> = tasks.iter().map(|t| t.title.clone()).collect();
        assert_eq!(titles, vec!["a", "c", "b"]);
    }

    #[test]
    fn clear_unwires_everything() {
        let a = task("a");
        let b = task("b");
        let tasks = ObservingCollection::from_items(vec![a.clone(), b.clone()]);

        let cleared = Rc::new(Cell::new(0));
        let c = cleared.clone();
        let _s = tasks.on_collection_changed(move |change| {
            if let CollectionChange::Cleared { count } = change {
                c.set(*count);
            }
        });

        tasks.clear();
        assert_eq!(cleared.get(), 2);
        assert_eq!(listeners(&a), 0);
        assert_eq!(listeners(&b), 0);
    }

    #[test]
    fn find_uses_value_equality() {
        let tasks = ObservingCollection::from_items(vec![task("a"), task("b")]);
        let wanted = Task {
            kit: EntityKit::new(),
            title: "b".into(),
        };
        assert!(tasks.find(&wanted).is_some_and(|t| t.title == "b"));
        assert!(!tasks.contains(&task("b")));
    }

    #[test]
    fn deserialized_items_are_wired_by_rewire() {
        let tasks: ObservingCollection<Task> =
            serde_json::from_str(r#"[{"title":"a"},{"title":"b"}]"#).unwrap();
        let first = tasks.first().unwrap();
        assert_eq!(listeners(&first), 0);

        tasks.rewire();
        assert_eq!(listeners(&first), 1);

        first.kit.set_message("loaded");
        assert_eq!(tasks.message(), "loaded");
    }

    #[test]
    fn serializes_as_sequence() {
        let tasks = ObservingCollection::from_items(vec![task("a")]);
        assert_eq!(serde_json::to_string(&tasks).unwrap(), r#"[{"title":"a"}]"#);
    }
}
