//! Listener interfaces and the listener collections objects expose.

use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Result of a preview-style listener method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Vote {
    #[default]
    Approve,
    Deny,
    Deferred,
}

impl Vote {
    /// Combines two votes: any denial wins, then any deferral.
    pub fn tally(self, other: Vote) -> Vote {
        match (self, other) {
            (Vote::Deny, _) | (_, Vote::Deny) => Vote::Deny,
            (Vote::Deferred, _) | (_, Vote::Deferred) => Vote::Deferred,
            _ => Vote::Approve,
        }
    }
}

/// The declared result of a listener method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Unit,
    Bool,
    Vote,
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerMethod {
    pub name: String,
    pub returns: ReturnKind,
}

/// A fixed listener interface: a named set of methods with return kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerInterface {
    name: String,
    methods: Vec<ListenerMethod>,
}

impl ListenerInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, name: impl Into<String>, returns: ReturnKind) -> Self {
        self.methods.push(ListenerMethod {
            name: name.into(),
            returns,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[ListenerMethod] {
        &self.methods
    }

    pub fn find(&self, method: &str) -> Option<&ListenerMethod> {
        self.methods.iter().find(|m| m.name == method)
    }

    /// The result an unmapped method yields.
    pub fn default_result(&self, method: &str) -> Value {
        match self.find(method).map(|m| m.returns) {
            Some(ReturnKind::Vote) => Value::Vote(Vote::Approve),
            Some(ReturnKind::Bool) => Value::Bool(false),
            _ => Value::Null,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Listener method '{method}' failed: {message}")]
pub struct ListenerError {
    pub method: String,
    pub message: String,
}

/// Something that receives listener method calls.
pub trait Listener {
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, ListenerError>;
}

/// The listener collection behind a listener property.
pub struct ListenerList {
    interface: Rc<ListenerInterface>,
    listeners: RefCell<Vec<Rc<dyn Listener>>>,
}

impl ListenerList {
    pub fn new(interface: Rc<ListenerInterface>) -> Self {
        Self {
            interface,
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn interface(&self) -> &Rc<ListenerInterface> {
        &self.interface
    }

    pub fn add(&self, listener: Rc<dyn Listener>) {
        self.listeners.borrow_mut().push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Calls `method` on every listener in registration order.
    pub fn fire(&self, method: &str, args: &[Value]) -> Result<Vec<Value>, ListenerError> {
        let listeners: Vec<Rc<dyn Listener>> = self.listeners.borrow().clone();
        listeners
            .iter()
            .map(|listener| listener.invoke(method, args))
            .collect()
    }

    /// Calls a vote-returning method and tallies the results.
    pub fn vote(&self, method: &str, args: &[Value]) -> Result<Vote, ListenerError> {
        let results = self.fire(method, args)?;
        Ok(results.into_iter().fold(Vote::Approve, |acc, result| match result {
            Value::Vote(v) => acc.tally(v),
            _ => acc,
        }))
    }
}

impl fmt::Debug for ListenerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerList")
            .field("interface", &self.interface.name())
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Value);

    impl Listener for Fixed {
        fn invoke(&self, _method: &str, _args: &[Value]) -> Result<Value, ListenerError> {
            Ok(self.0.clone())
        }
    }

    fn window_interface() -> Rc<ListenerInterface> {
        Rc::new(
            ListenerInterface::new("WindowStateListener")
                .method("previewWindowClose", ReturnKind::Vote)
                .method("isModal", ReturnKind::Bool)
                .method("windowClosed", ReturnKind::Unit),
        )
    }

    #[test]
    fn test_default_results_follow_return_kind() {
        let iface = window_interface();
        assert_eq!(iface.default_result("previewWindowClose"), Value::Vote(Vote::Approve));
        assert_eq!(iface.default_result("isModal"), Value::Bool(false));
        assert_eq!(iface.default_result("windowClosed"), Value::Null);
        assert_eq!(iface.default_result("unknown"), Value::Null);
    }

    #[test]
    fn test_vote_tally() {
        assert_eq!(Vote::Approve.tally(Vote::Approve), Vote::Approve);
        assert_eq!(Vote::Approve.tally(Vote::Deferred), Vote::Deferred);
        assert_eq!(Vote::Deferred.tally(Vote::Deny), Vote::Deny);
    }

    #[test]
    fn test_list_vote_combines_listeners() {
        let list = ListenerList::new(window_interface());
        list.add(Rc::new(Fixed(Value::Vote(Vote::Approve))));
        list.add(Rc::new(Fixed(Value::Vote(Vote::Deny))));

        assert_eq!(list.vote("previewWindowClose", &[]).unwrap(), Vote::Deny);
        assert_eq!(list.fire("windowClosed", &[]).unwrap().len(), 2);
    }
}
