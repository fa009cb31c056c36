// ============================================================================
// spark-entities - Property Notifier
// "Named property changed" dispatch, the leaf capability of every entity
// ============================================================================

use crate::events::observers::{Observers, Subscription};

/// Dispatches "property `name` changed" to subscribed listeners.
///
/// Listeners either filter on one property name or receive every
/// notification (wildcard). Delivery is synchronous, in subscription order.
/// Re-entrant `notify` calls from inside a listener are allowed and are not
/// deduplicated.
///
/// # Example
///
/// ```
/// use spark_entities::PropertyNotifier;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let notifier = PropertyNotifier::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let all = seen.clone();
/// let _any = notifier.subscribe(None, move |name| all.borrow_mut().push(name.to_string()));
/// let only_title = seen.clone();
/// let _title = notifier.subscribe(Some("title"), move |_| only_title.borrow_mut().push("title!".into()));
///
/// notifier.notify("title");
/// notifier.notify("body");
///
/// assert_eq!(*seen.borrow(), vec!["title", "title!", "body"]);
/// ```
#[derive(Debug, Default)]
pub struct PropertyNotifier {
    listeners: Observers<str>,
}

impl PropertyNotifier {
    pub fn new() -> Self {
        Self {
            listeners: Observers::new(),
        }
    }

    /// Subscribe to changes of `name`, or to every property when `name` is `None`.
    pub fn subscribe(
        &self,
        name: Option<&str>,
        listener: impl Fn(&str) + 'static,
    ) -> Subscription {
        match name {
            None => self.listeners.subscribe(listener),
            Some(filter) => {
                let filter = filter.to_owned();
                self.listeners.subscribe(move |changed: &str| {
                    if changed == filter {
                        listener(changed);
                    }
                })
            }
        }
    }

    /// Fire property-changed for `name`. A no-op without listeners.
    pub fn notify(&self, name: &str) {
        self.listeners.emit(name);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn filtered_listener_ignores_other_names() {
        let notifier = PropertyNotifier::new();
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        let _sub = notifier.subscribe(Some("name"), move |_| h.set(h.get() + 1));

        notifier.notify("other");
        notifier.notify("name");
        notifier.notify("name");

        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn notify_without_listeners_does_nothing() {
        let notifier = PropertyNotifier::new();
        notifier.notify("anything");
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn reentrant_notify_is_delivered() {
        let notifier = Rc::new(PropertyNotifier::new());
        let log = Rc::new(std::cell::RefCell::new(Vec::new()));

        let n = Rc::downgrade(&notifier);
        let l = log.clone();
        let _sub = notifier.subscribe(None, move |name| {
            l.borrow_mut().push(name.to_string());
            if name == "first" {
                if let Some(n) = n.upgrade() {
                    n.notify("second");
                }
            }
        });

        notifier.notify("first");
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }
}
