// ============================================================================
// spark-entities - Tree Node
// A composite entity pairing an item with a parent link and child nodes
// ============================================================================
//
// Ownership runs downward: a node owns its children (Rc inside an
// ObservingCollection) and refers to its parent through a Weak, so dropping
// a subtree never drops its ancestors. Because the children live in an
// ObservingCollection embedded in the node, any change or message anywhere
// below a node bubbles up through every ancestor automatically.
//
// A node is either detached (no parent) or attached. Attaching under a node
// that is the candidate itself or one of its descendants is rejected, so
// parent chains are always acyclic.
// ============================================================================

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::traversal::{InsertMode, TraversalOptions};
use crate::collections::{CollectionChange, ObservingCollection};
use crate::core::error::{EntityError, Result};
use crate::core::kit::EntityKit;
use crate::core::types::{Entity, Slot};
use crate::events::observers::Subscription;
use crate::primitives::{Embedded, Field};

/// A tree element. Always handled through `Rc<Node<T>>`.
///
/// # Example
///
/// ```
/// use spark_entities::{Entity, Node, TraversalOptions};
///
/// let root = Node::new("root");
/// let a = root.add_child("a", false).unwrap();
/// a.add_child("a1", false);
/// root.add_child("a", true); // suppressed: "a" is already a direct child
///
/// assert_eq!(root.get_count(TraversalOptions::recursive()), 2);
/// assert!(root.item_exists(&"a1", TraversalOptions::recursive()));
///
/// root.accept_changes();
/// a.set_message("a1 loaded");
/// assert_eq!(root.message(), "a1 loaded");
/// ```
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct Node<T> {
    #[serde(skip)]
    kit: EntityKit,
    item: Field<T>,
    #[serde(skip)]
    parent: RefCell<Weak<Node<T>>>,
    children: Embedded<ObservingCollection<Node<T>>>,
}

impl<T: PartialEq + Clone + 'static> Node<T> {
    /// A new detached node.
    pub fn new(item: T) -> Rc<Self> {
        let kit = EntityKit::new();
        let children = Embedded::new(&kit, ObservingCollection::new());
        Rc::new(Self {
            kit,
            item: Field::new(item),
            parent: RefCell::new(Weak::new()),
            children,
        })
    }

    // =========================================================================
    // ITEM & MESSAGE
    // =========================================================================

    pub fn item(&self) -> T {
        self.item.get()
    }

    pub fn with_item<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.item.with(f)
    }

    /// Replace the item; marks the node changed and notifies `"item"`.
    pub fn set_item(&self, item: T) -> bool {
        self.kit.set_value(&self.item, item, "item")
    }

    pub fn set_message(&self, message: &str) -> bool {
        self.kit.set_message(message)
    }

    // =========================================================================
    // STRUCTURE
    // =========================================================================

    /// Read-only view of the direct children.
    pub fn children(&self) -> Children<'_, T> {
        Children {
            list: &self.children,
        }
    }

    pub fn parent(&self) -> Option<Rc<Self>> {
        self.parent.borrow().upgrade()
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    /// The topmost ancestor, or this node when it is detached.
    pub fn root(self: &Rc<Self>) -> Rc<Self> {
        self.top_ancestor().unwrap_or_else(|| self.clone())
    }

    /// Number of ancestors.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(node) = current {
            depth += 1;
            current = node.parent();
        }
        depth
    }

    fn top_ancestor(&self) -> Option<Rc<Self>> {
        let mut current = self.parent()?;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        Some(current)
    }

    fn on_root<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        match self.top_ancestor() {
            Some(root) => f(&root),
            None => f(self),
        }
    }

    /// True when `candidate` is this node or one of its ancestors.
    fn is_self_or_ancestor(self: &Rc<Self>, candidate: &Rc<Self>) -> bool {
        let mut visited: HashSet<*const Self> = HashSet::new();
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if Rc::ptr_eq(&node, candidate) {
                return true;
            }
            if !visited.insert(Rc::as_ptr(&node)) {
                return false;
            }
            current = node.parent();
        }
        false
    }

    fn attach(self: &Rc<Self>, child: Rc<Self>) {
        child.parent.replace(Rc::downgrade(self));
        self.children.push(child);
    }

    fn blocks(&self, item: &T, mode: InsertMode) -> bool {
        if mode == InsertMode::UniqueInTree
            && self.on_root(|root| root.with_item(|own| own == item))
        {
            return true;
        }
        mode.existence_check()
            .is_some_and(|opts| self.item_exists(item, opts))
    }

    // =========================================================================
    // INSERTION
    // =========================================================================

    /// Wrap `item` in a new child node and append it.
    ///
    /// With `unique`, nothing is added when a direct child already holds an
    /// equal item. Returns the new node, or `None` when suppressed.
    pub fn add_child(self: &Rc<Self>, item: T, unique: bool) -> Option<Rc<Self>> {
        self.insert_child(item, InsertMode::from(unique))
    }

    /// [`add_child`](Self::add_child) with the full range of uniqueness checks.
    pub fn insert_child(self: &Rc<Self>, item: T, mode: InsertMode) -> Option<Rc<Self>> {
        if self.blocks(&item, mode) {
            trace!(?mode, "duplicate child item skipped");
            return None;
        }
        let child = Node::new(item);
        self.attach(child.clone());
        Some(child)
    }

    /// Attach an existing node, detaching it from its previous parent.
    ///
    /// Fails with [`EntityError::Cycle`] when `node` is this node or one of
    /// its ancestors. Returns `Ok(None)` when `mode` suppresses the insert.
    pub fn add_node(self: &Rc<Self>, node: Rc<Self>, mode: InsertMode) -> Result<Option<Rc<Self>>> {
        if self.is_self_or_ancestor(&node) {
            debug!(depth = self.depth(), "rejected attaching a node beneath itself");
            return Err(EntityError::Cycle);
        }
        if node.with_item(|item| self.blocks(item, mode)) {
            trace!(?mode, "duplicate child node skipped");
            return Ok(None);
        }
        if let Some(previous) = node.parent() {
            previous.remove_child(&node);
        }
        self.attach(node.clone());
        Ok(Some(node))
    }

    /// Detach a direct child. Returns false when `node` is not one.
    pub fn remove_child(&self, node: &Rc<Self>) -> bool {
        if !self.children.remove(node) {
            return false;
        }
        node.parent.replace(Weak::new());
        true
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Count descendants.
    ///
    /// With `unique`, counts distinct items (see [`get_items`](Self::get_items)).
    pub fn get_count(&self, opts: TraversalOptions) -> usize {
        if opts.from_root {
            return self.on_root(|root| root.get_count(opts.at_root()));
        }
        if opts.unique {
            return self.get_items(opts).len();
        }

        let children = self.children.to_vec();
        let mut count = children.len();
        if opts.recursive {
            count += children
                .iter()
                .map(|child| child.get_count(opts))
                .sum::<usize>();
        }
        count
    }

    /// Items of descendants in depth-first pre-order.
    ///
    /// With `unique`, an item equal to one already collected anywhere in
    /// the traversal is skipped.
    pub fn get_items(&self, opts: TraversalOptions) -> Vec<T> {
        if opts.from_root {
            return self.on_root(|root| root.get_items(opts.at_root()));
        }
        let mut items = Vec::new();
        self.collect_items(opts, &mut items);
        items
    }

    fn collect_items(&self, opts: TraversalOptions, out: &mut Vec<T>) {
        for child in self.children.iter() {
            let item = child.item();
            if !opts.unique || !out.contains(&item) {
                out.push(item);
            }
            if opts.recursive {
                child.collect_items(opts, out);
            }
        }
    }

    pub fn item_exists(&self, item: &T, opts: TraversalOptions) -> bool {
        self.get_existing_node(item, opts).is_some()
    }

    /// First descendant (depth-first pre-order) holding an equal item.
    pub fn get_existing_node(&self, item: &T, opts: TraversalOptions) -> Option<Rc<Self>> {
        if opts.from_root {
            return self.on_root(|root| root.get_existing_node(item, opts.at_root()));
        }
        for child in self.children.iter() {
            if child.with_item(|candidate| candidate == item) {
                return Some(child);
            }
            if opts.recursive {
                if let Some(found) = child.get_existing_node(item, opts) {
                    return Some(found);
                }
            }
        }
        None
    }

    // =========================================================================
    // COPY
    // =========================================================================

    /// A detached copy with cloned items, optionally with copies of every
    /// descendant. The copy shares no nodes or subscriptions with `self`.
    pub fn get_copy(&self, with_children: bool) -> Rc<Self> {
        let copy = Node::new(self.item());
        if with_children {
            for child in self.children.iter() {
                copy.attach(child.get_copy(true));
            }
        }
        copy
    }
}

impl<T: 'static> Entity for Node<T> {
    fn kit(&self) -> &EntityKit {
        &self.kit
    }

    fn slots(&self) -> Vec<&dyn Slot> {
        vec![&self.children]
    }

    fn property_names(&self) -> &'static [&'static str] {
        &["item"]
    }

    /// Point every direct child's parent link back at `this`.
    fn bind_self(this: &Rc<Self>) {
        for child in this.children.iter() {
            child.parent.replace(Rc::downgrade(this));
        }
    }
}

// =============================================================================
// CHILDREN VIEW
// =============================================================================

/// The direct children of a [`Node`], readable and observable but not
/// mutable. Structural changes go through [`Node::add_child`],
/// [`Node::insert_child`], [`Node::add_node`] and [`Node::remove_child`],
/// which keep every child's parent link in step with its position.
///
/// ```compile_fail
/// use spark_entities::Node;
///
/// let root = Node::new(0);
/// root.children().push(Node::new(1));
/// ```
pub struct Children<'a, T> {
    list: &'a ObservingCollection<Node<T>>,
}

impl<'a, T: 'static> Children<'a, T> {
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Rc<Node<T>>> {
        self.list.get(index)
    }

    pub fn first(&self) -> Option<Rc<Node<T>>> {
        self.list.first()
    }

    pub fn last(&self) -> Option<Rc<Node<T>>> {
        self.list.last()
    }

    /// Snapshot iterator over the children.
    pub fn iter(&self) -> std::vec::IntoIter<Rc<Node<T>>> {
        self.list.iter()
    }

    pub fn to_vec(&self) -> Vec<Rc<Node<T>>> {
        self.list.to_vec()
    }

    pub fn contains(&self, node: &Rc<Node<T>>) -> bool {
        self.list.contains(node)
    }

    pub fn position(&self, node: &Rc<Node<T>>) -> Option<usize> {
        self.list.position(node)
    }

    /// Dirty flag of the child collection.
    pub fn is_changed(&self) -> bool {
        self.list.is_changed()
    }

    /// Latest message bubbled up from any child.
    pub fn message(&self) -> String {
        self.list.message()
    }

    /// The child collection's kit, for subscribing to its signals.
    pub fn kit(&self) -> &'a EntityKit {
        self.list.kit()
    }

    /// Subscribe to structural changes of the child list.
    pub fn on_collection_changed(
        &self,
        listener: impl Fn(&CollectionChange) + 'static,
    ) -> Subscription {
        self.list.on_collection_changed(listener)
    }
}

impl<T: fmt::Debug> fmt::Debug for Children<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.list, f)
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("item", &self.item)
            .field("is_root", &self.parent.borrow().upgrade().is_none())
            .field("children", &*self.children)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
