use spark_entities::{ChildSlot, Entity, EntityKit, Node, ObservingCollection, Observers};
use std::cell::Cell;
use std::rc::{Rc, Weak};

#[derive(Default)]
struct Leaf {
    kit: EntityKit,
}

impl Entity for Leaf {
    fn kit(&self) -> &EntityKit {
        &self.kit
    }
}

fn leaf() -> Rc<Leaf> {
    Rc::new(Leaf::default())
}

fn owner_listeners(leaf: &Leaf) -> usize {
    leaf.kit.tracker().map_or(0, |t| t.listener_count())
}

#[test]
fn dropping_subscription_stops_delivery() {
    let observers: Observers<u8> = Observers::new();
    let hits = Rc::new(Cell::new(0));

    {
        let h = hits.clone();
        let _sub = observers.subscribe(move |_| h.set(h.get() + 1));
        observers.emit(&1);
        // _sub drops here
    }

    observers.emit(&2);
    assert_eq!(hits.get(), 1);
    assert!(observers.is_empty());
}

#[test]
fn forgotten_subscription_outlives_handle() {
    let observers: Observers<u8> = Observers::new();
    let hits = Rc::new(Cell::new(0));

    let h = hits.clone();
    observers.subscribe(move |_| h.set(h.get() + 1)).forget();

    observers.emit(&1);
    observers.emit(&2);
    assert_eq!(hits.get(), 2);
}

#[test]
fn subscription_outliving_observers_is_harmless() {
    let sub = {
        let observers: Observers<u8> = Observers::new();
        observers.subscribe(|_| {})
    };
    assert!(sub.is_active());
    sub.unsubscribe();
}

#[test]
fn dropping_owner_releases_child_subscriptions() {
    let child = leaf();
    {
        let kit = EntityKit::new();
        let slot = ChildSlot::with_child(&kit, child.clone());
        assert!(slot.is_wired());
        assert_eq!(owner_listeners(&child), 1);
    }
    assert_eq!(owner_listeners(&child), 0);
}

#[test]
fn child_does_not_keep_owner_alive() {
    let child = leaf();
    let weak_owner: Weak<ObservingCollection<Leaf>> = {
        let collection = Rc::new(ObservingCollection::new());
        collection.push(child.clone());
        Rc::downgrade(&collection)
    };

    assert!(weak_owner.upgrade().is_none());
    child.kit.mark_changed();
    child.kit.set_message("nobody listening");
}

#[test]
fn clearing_collection_unsubscribes_every_item() {
    let items: Vec<_> = (0..4).map(|_| leaf()).collect();
    let collection = ObservingCollection::from_items(items.iter().cloned());
    assert!(items.iter().all(|item| owner_listeners(item) == 1));

    collection.clear();
    assert!(items.iter().all(|item| owner_listeners(item) == 0));
    assert!(collection.is_empty());
}

#[test]
fn dropping_root_frees_whole_tree() {
    let weak_leaf = {
        let root = Node::new(0u32);
        let child = root.add_child(1, false).unwrap();
        let grandchild = child.add_child(2, false).unwrap();
        Rc::downgrade(&grandchild)
    };
    assert!(weak_leaf.upgrade().is_none());
}

#[test]
fn detached_subtree_survives_parent_drop() {
    let orphan = {
        let root = Node::new("root");
        let a = root.add_child("a", false).unwrap();
        a.add_child("a1", false);
        assert!(root.remove_child(&a));
        a
    };

    assert!(orphan.is_root());
    assert_eq!(orphan.children().len(), 1);
    let a1 = orphan.children().first().unwrap();
    assert!(Rc::ptr_eq(&a1.parent().unwrap(), &orphan));
}
