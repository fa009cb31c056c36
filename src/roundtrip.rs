// ============================================================================
// spark-entities - Round Trip
// The contract persistence layers rely on: load, copy, and commit
// ============================================================================
//
// Persistence itself (files, formats beyond JSON) lives outside this crate.
// What the graph guarantees is:
//
// - a loaded entity is rewired exactly like a constructed one, with
//   is_changed == false and an empty message across the whole subtree
// - a failed load returns the error before any rewiring happens
// - a deep copy is a serialize/deserialize round trip
// - after a successful save, commit() accepts the whole tree
// ============================================================================

use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::core::error::{EntityError, Result};
use crate::core::types::Entity;

/// Serialize an entity graph to JSON.
pub fn to_json<E: Serialize>(entity: &E) -> Result<String> {
    serde_json::to_string(entity).map_err(EntityError::Serialize)
}

/// Pretty-printed [`to_json`].
pub fn to_json_pretty<E: Serialize>(entity: &E) -> Result<String> {
    serde_json::to_string_pretty(entity).map_err(EntityError::Serialize)
}

pub fn to_value<E: Serialize>(entity: &E) -> Result<serde_json::Value> {
    serde_json::to_value(entity).map_err(EntityError::Serialize)
}

/// Load an entity graph from JSON and bring it to the post-load state.
///
/// # Example
///
/// ```
/// use spark_entities::{roundtrip, Entity, Node};
///
/// let tree: std::rc::Rc<Node<String>> =
///     roundtrip::from_json(r#"{"item":"root","children":[{"item":"a","children":[]}]}"#)
///         .unwrap();
///
/// assert!(!tree.is_changed());
/// let a = tree.children().first().unwrap();
/// assert!(std::rc::Rc::ptr_eq(&a.parent().unwrap(), &tree));
///
/// a.set_message("edited");
/// assert_eq!(tree.message(), "edited");
/// ```
pub fn from_json<E: Entity + DeserializeOwned>(json: &str) -> Result<Rc<E>> {
    let entity: E = serde_json::from_str(json).map_err(EntityError::Deserialize)?;
    Ok(restore(entity))
}

pub fn from_value<E: Entity + DeserializeOwned>(value: serde_json::Value) -> Result<Rc<E>> {
    let entity: E = serde_json::from_value(value).map_err(EntityError::Deserialize)?;
    Ok(restore(entity))
}

/// Finish loading a freshly deserialized entity: share it, rewire the whole
/// subtree, and clear flags and messages without emitting anything.
pub fn restore<E: Entity>(entity: E) -> Rc<E> {
    let entity = Rc::new(entity);
    E::bind_self(&entity);
    entity.rewire();
    entity.settle();
    debug!(entity = std::any::type_name::<E>(), "restored entity graph");
    entity
}

/// Independent copy of the graph below `entity`, in the post-load state.
pub fn deep_copy<E: Entity + Serialize + DeserializeOwned>(entity: &E) -> Result<Rc<E>> {
    from_value(to_value(entity)?)
}

/// Accept the whole tree after a successful save.
pub fn commit(entity: &dyn Entity) {
    entity.accept_changes();
    debug!("committed entity graph");
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChildSlot, Embedded, EntityKit, Field, Node, ObservingCollection, Slot};
    use serde::Deserialize;

    #[derive(Default, Serialize, Deserialize)]
    struct Line {
        #[serde(skip)]
        kit: EntityKit,
        text: Field<String>,
    }

    impl Entity for Line {
        fn kit(&self) -> &EntityKit {
            &self.kit
        }
    }

    fn line(text: &str) -> Rc<Line> {
        Rc::new(Line {
            kit: EntityKit::new(),
            text: Field::new(text.to_string()),
        })
    }

    #[derive(Serialize, Deserialize)]
    struct Page {
        #[serde(skip)]
        kit: EntityKit,
        title: Field<String>,
        footer: ChildSlot<Line>,
        lines: Embedded<ObservingCollection<Line>>,
    }

    impl Page {
        fn new(title: &str) -> Self {
            let kit = EntityKit::new();
            let lines = Embedded::new(&kit, ObservingCollection::new());
            Self {
                kit,
                title: Field::new(title.to_string()),
                footer: ChildSlot::new(),
                lines,
            }
        }
    }

    impl Entity for Page {
        fn kit(&self) -> &EntityKit {
            &self.kit
        }

        fn slots(&self) -> Vec<&dyn Slot> {
            vec![&self.footer, &self.lines]
        }

        fn property_names(&self) -> &'static [&'static str] {
            &["title", "footer"]
        }
    }

    const PAGE: &str =
        r#"{"title":"t","footer":{"text":"f"},"lines":[{"text":"one"},{"text":"two"}]}"#;

    #[test]
    fn load_leaves_graph_clean_and_wired() {
        let page: Rc<Page> = from_json(PAGE).unwrap();

        assert!(!page.is_changed());
        assert_eq!(page.message(), "");
        assert!(!page.lines.is_changed());
        assert!(page.lines.iter().all(|l| !l.is_changed()));
        assert!(page.footer.is_wired());
        assert!(page.lines.is_wired());

        let second = page.lines.get().get(1).unwrap();
        second.kit.set_message("two edited");
        assert_eq!(page.lines.message(), "two edited");
        assert_eq!(page.message(), "two edited");

        page.accept_changes();
        let footer = page.footer.get().unwrap();
        footer.kit.set_value(&footer.text, "new footer".into(), "text");
        assert!(page.is_changed());
    }

    #[test]
    fn failed_load_is_a_deserialize_error() {
        let result = from_json::<Page>(r#"{"title": 5}"#);
        assert!(matches!(result, Err(EntityError::Deserialize(_))));

        let result = from_json::<Page>("{not json");
        assert!(matches!(result, Err(EntityError::Deserialize(_))));
    }

    #[test]
    fn stale_message_is_not_carried_through_load() {
        let page = Page::new("t");
        page.lines.push(line("a"));
        page.lines.first().unwrap().kit.set_message("pending save");
        assert_eq!(page.message(), "pending save");

        let loaded: Rc<Page> = from_json(&to_json(&page).unwrap()).unwrap();
        assert_eq!(loaded.message(), "");
        assert_eq!(loaded.lines.first().unwrap().message(), "");
    }

    #[test]
    fn deep_copy_is_independent() {
        let page = Page::new("original");
        page.footer.set(&page.kit, Some(line("foot")), "footer");
        page.lines.push(line("a"));

        let copy = deep_copy(&page).unwrap();
        assert_eq!(copy.title.get(), "original");
        assert_eq!(copy.lines.len(), 1);
        assert!(!copy.is_changed());

        page.accept_changes();
        copy.lines.push(line("b"));
        copy.footer.get().unwrap().kit.set_message("copy");

        assert_eq!(page.lines.len(), 1);
        assert!(!page.is_changed());
        assert_eq!(page.message(), "");
        assert_eq!(copy.message(), "copy");
    }

    #[test]
    fn commit_accepts_everything() {
        let page = Page::new("t");
        page.footer.set(&page.kit, Some(line("f")), "footer");
        page.lines.push(line("a"));

        commit(&page);
        assert!(!page.is_changed());
        assert!(!page.footer.get().unwrap().is_changed());
        assert!(!page.lines.first().unwrap().is_changed());
    }

    #[test]
    fn node_tree_round_trip_relinks_parents() {
        let root = Node::new("root".to_string());
        let a = root.add_child("a".to_string(), false).unwrap();
        a.add_child("a1".to_string(), false);

        let json = to_json_pretty(&*root).unwrap();
        let loaded: Rc<Node<String>> = from_json(&json).unwrap();

        let loaded_a = loaded.children().first().unwrap();
        let loaded_a1 = loaded_a.children().first().unwrap();
        assert!(Rc::ptr_eq(&loaded_a.parent().unwrap(), &loaded));
        assert!(Rc::ptr_eq(&loaded_a1.root(), &loaded));
        assert!(!loaded_a1.is_changed());

        loaded_a1.set_message("deep");
        assert_eq!(loaded.message(), "deep");
    }

    #[test]
    fn notify_all_uses_declared_names() {
        let page = Page::new("t");
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));

        let s = seen.clone();
        let _sub = page
            .kit
            .on_property_changed(None, move |n| s.borrow_mut().push(n.to_string()));
        page.notify_all_properties_changed();

        assert_eq!(*seen.borrow(), vec!["title", "footer"]);
    }
}
