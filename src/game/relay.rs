//! Handler Relay
//!
//! A relay holds at most one handler per capability and routes newly added
//! objects to every handler whose capability they provide. An area owns one
//! relay and toggles all of its handlers together.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::handled::{Capabilities, Capability, Handled, HandlerType};
use super::handler::Handler;

/// Type-erased view of a `Handler<C>`, so one relay can hold every capability.
trait RelayedHandler {
    /// Add the object's view for this handler's capability, if it has one.
    fn accept(&self, caps: &Capabilities) -> bool;
    fn set_handling_state(&self, state: bool);
    fn member_count(&self) -> usize;
    fn kill(&self);
}

impl<C: Capability> RelayedHandler for Handler<C> {
    fn accept(&self, caps: &Capabilities) -> bool {
        match caps.get::<C>() {
            Some(target) => {
                Handler::<C>::add(self, target);
                true
            }
            None => false,
        }
    }

    fn set_handling_state(&self, state: bool) {
        Handler::<C>::set_handling_state(self, state);
    }

    fn member_count(&self) -> usize {
        self.len()
    }

    fn kill(&self) {
        Handler::<C>::kill(self);
    }
}

#[derive(Clone)]
struct RelayEntry {
    handler_type: HandlerType,
    handler: Rc<dyn RelayedHandler>,
    /// Same handler, kept for typed lookups
    any: Rc<dyn Any>,
}

impl RelayEntry {
    fn new<C: Capability>(handler: Rc<Handler<C>>) -> Self {
        Self {
            handler_type: HandlerType::of::<C>(),
            handler: handler.clone(),
            any: handler,
        }
    }
}

/// Registry of handlers, one per handler type, in registration order.
#[derive(Default)]
pub struct HandlerRelay {
    entries: RefCell<Vec<RelayEntry>>,
}

impl HandlerRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for its capability.
    ///
    /// Replaces (and returns) a previous handler of the same type, keeping its
    /// position in the registration order.
    pub fn add_handler<C: Capability>(&self, handler: Rc<Handler<C>>) -> Option<Rc<Handler<C>>> {
        let entry = RelayEntry::new(handler);
        let mut entries = self.entries.borrow_mut();

        match entries
            .iter_mut()
            .find(|existing| existing.handler_type == entry.handler_type)
        {
            Some(existing) => {
                tracing::warn!(handler = %entry.handler_type, "replacing registered handler");
                let previous = std::mem::replace(existing, entry);
                previous.any.downcast::<Handler<C>>().ok()
            }
            None => {
                entries.push(entry);
                None
            }
        }
    }

    /// Builder-style `add_handler` for a fresh handler.
    pub fn with_handler<C: Capability>(self, auto_death: bool) -> Self {
        self.add_handler(Rc::new(Handler::<C>::new(auto_death)));
        self
    }

    /// The handler registered for capability `C`.
    pub fn handler<C: Capability>(&self) -> Option<Rc<Handler<C>>> {
        let ty = HandlerType::of::<C>();
        self.entries
            .borrow()
            .iter()
            .find(|entry| entry.handler_type == ty)
            .and_then(|entry| entry.any.clone().downcast::<Handler<C>>().ok())
    }

    /// Unregister the handler for `handler_type`. Returns true if one was registered.
    pub fn remove_handler(&self, handler_type: HandlerType) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|entry| entry.handler_type != handler_type);
        entries.len() < before
    }

    pub fn contains(&self, handler_type: HandlerType) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|entry| entry.handler_type == handler_type)
    }

    /// Registered handler types, in registration order.
    pub fn handler_types(&self) -> Vec<HandlerType> {
        self.entries
            .borrow()
            .iter()
            .map(|entry| entry.handler_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Add `object` to every handler whose capability it provides.
    ///
    /// Returns how many handlers took it; zero is fine (the object is simply
    /// not tracked here). Adding the same object again changes nothing.
    pub fn add_handled(&self, object: Rc<dyn Handled>) -> usize {
        if object.is_dead() {
            tracing::trace!("not relaying a dead object");
            return 0;
        }

        let caps = Capabilities::of(object);
        if caps.is_empty() {
            return 0;
        }

        self.snapshot()
            .iter()
            .filter(|entry| entry.handler.accept(&caps))
            .count()
    }

    /// Turn every handler on or off, in registration order.
    pub fn set_handling_states(&self, state: bool) {
        for entry in self.snapshot() {
            entry.handler.set_handling_state(state);
        }
    }

    /// Total members over all handlers (an object in two handlers counts twice).
    pub fn member_count(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .map(|entry| entry.handler.member_count())
            .sum()
    }

    /// Kill every handler and forget them.
    pub fn kill_all(&self) {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        for entry in entries {
            entry.handler.kill();
        }
    }

    // Handlers may call back into the relay while being driven
    fn snapshot(&self) -> Vec<RelayEntry> {
        self.entries.borrow().clone()
    }
}

impl fmt::Debug for HandlerRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRelay")
            .field("handlers", &self.handler_types())
            .finish()
    }
}
