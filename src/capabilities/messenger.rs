// ============================================================================
// spark-entities - Message Broadcaster
// A single current status message with an equality-suppressed signal
// ============================================================================

use std::cell::RefCell;

use crate::events::observers::{Observers, Subscription};

/// Holds the entity's current message and raises it to subscribers.
///
/// The signal fires only when the message actually changes, so setting the
/// same text twice raises once. That suppression is also what stops a
/// message from circling forever in a cyclic graph. Owners' bubbling
/// handlers are delivered after ordinary listeners.
///
/// # Example
///
/// ```
/// use spark_entities::MessageBroadcaster;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let messenger = MessageBroadcaster::new();
/// let raised = Rc::new(Cell::new(0));
///
/// let r = raised.clone();
/// let _sub = messenger.on_message(move |_| r.set(r.get() + 1));
///
/// messenger.set("saving");
/// messenger.set("saving");
/// assert_eq!(raised.get(), 1);
/// assert_eq!(messenger.message(), "saving");
/// ```
#[derive(Debug, Default)]
pub struct MessageBroadcaster {
    message: RefCell<String>,
    raised: Observers<str>,
    upward: Observers<str>,
}

impl MessageBroadcaster {
    pub fn new() -> Self {
        Self {
            message: RefCell::new(String::new()),
            raised: Observers::new(),
            upward: Observers::new(),
        }
    }

    /// Current message (empty by default).
    pub fn message(&self) -> String {
        self.message.borrow().clone()
    }

    /// Replace the message. Returns false, raising nothing, when unchanged.
    pub fn set(&self, message: &str) -> bool {
        if *self.message.borrow() == message {
            return false;
        }
        self.message.replace(message.to_owned());
        self.raised.emit(message);
        self.upward.emit(message);
        true
    }

    /// Reset to the empty message without raising.
    pub fn settle(&self) {
        self.message.borrow_mut().clear();
    }

    /// Subscribe to "message raised". The argument is the new message.
    pub fn on_message(&self, listener: impl Fn(&str) + 'static) -> Subscription {
        self.raised.subscribe(listener)
    }

    pub(crate) fn on_message_upward(&self, listener: impl Fn(&str) + 'static) -> Subscription {
        self.upward.subscribe(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.raised.len() + self.upward.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn defaults_to_empty() {
        assert_eq!(MessageBroadcaster::new().message(), "");
    }

    #[test]
    fn raises_new_values_in_order() {
        let messenger = MessageBroadcaster::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        let _sub = messenger.on_message(move |m| l.borrow_mut().push(m.to_string()));

        assert!(messenger.set("x"));
        assert!(messenger.set("y"));
        assert!(!messenger.set("y"));

        assert_eq!(*log.borrow(), vec!["x", "y"]);
    }

    #[test]
    fn setting_empty_on_fresh_messenger_is_noop() {
        let messenger = MessageBroadcaster::new();
        assert!(!messenger.set(""));
    }

    #[test]
    fn settle_clears_quietly() {
        let messenger = MessageBroadcaster::new();
        messenger.set("stale");

        let log = Rc::new(RefCell::new(Vec::<String>::new()));
        let l = log.clone();
        let _sub = messenger.on_message(move |m| l.borrow_mut().push(m.to_string()));

        messenger.settle();
        assert_eq!(messenger.message(), "");
        assert!(log.borrow().is_empty());
    }
}
