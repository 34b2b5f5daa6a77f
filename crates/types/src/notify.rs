//! Per-object publish/subscribe channel for property changes.

use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Callback invoked with the changed key and the value it replaced.
pub type ChangeCallback = Rc<dyn Fn(&str, &Value)>;

/// Subscribers keyed by property name.
///
/// Subscriptions are permanent. Callbacks run synchronously on the thread
/// that publishes, once per publish, in subscription order.
#[derive(Default)]
pub struct ChangeNotifier {
    subscribers: RefCell<Vec<(String, ChangeCallback)>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to changes of `key`.
    pub fn subscribe(&self, key: impl Into<String>, callback: impl Fn(&str, &Value) + 'static) {
        self.subscribers
            .borrow_mut()
            .push((key.into(), Rc::new(callback)));
    }

    /// Notifies every subscriber of `key`.
    ///
    /// The subscriber list is snapshotted first so callbacks may subscribe
    /// or publish without re-entering the borrow.
    pub fn publish(&self, key: &str, previous: &Value) {
        let callbacks: Vec<ChangeCallback> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, cb)| cb.clone())
            .collect();

        for callback in callbacks {
            callback(key, previous);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
