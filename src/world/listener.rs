//! Area Listeners
//!
//! `AreaListenerHandler` is the area-event flavour of the generic `Handler`:
//! one dispatch pass per event, delivered only to listeners whose selector
//! accepts the transition. The handler is itself an `AreaListener`, so handlers
//! can be chained (an area's events relayed into another fan-out).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::event::{AreaEvent, AreaEventSelector};
use crate::error::DispatchError;
use crate::game::{Capabilities, Capability, Handled, Handler, HandlingOperators, StateOperator};

/// Something interested in area state changes.
pub trait AreaListener: Handled {
    /// Which transitions this listener wants.
    fn area_event_selector(&self) -> &AreaEventSelector;

    /// Called for every selected transition.
    fn on_area_event(&self, event: &AreaEvent) -> Result<(), DispatchError>;
}

/// Capability of objects implementing `AreaListener`.
pub struct AreaListening;

impl Capability for AreaListening {
    type Target = dyn AreaListener;
    const NAME: &'static str = "area-listener";
}

/// Fan-out of area events to subscribed listeners.
pub struct AreaListenerHandler {
    handler: Handler<AreaListening>,
    selector: AreaEventSelector,
    /// Event of the pass in progress, if any
    current: RefCell<Option<AreaEvent>>,
}

impl AreaListenerHandler {
    pub fn new(auto_death: bool) -> Self {
        Self {
            handler: Handler::new(auto_death),
            selector: AreaEventSelector::All,
            current: RefCell::new(None),
        }
    }

    /// Subscribe `listener`. Returns false if it was already subscribed.
    pub fn add(&self, listener: Rc<dyn AreaListener>) -> bool {
        self.handler.add(listener)
    }

    /// Unsubscribe `listener`.
    pub fn remove(&self, listener: &Rc<dyn AreaListener>) -> bool {
        self.handler.remove(listener)
    }

    /// The underlying generic handler.
    pub fn handler(&self) -> &Handler<AreaListening> {
        &self.handler
    }

    /// The event currently being dispatched.
    pub fn current_event(&self) -> Option<AreaEvent> {
        self.current.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.handler.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handler.is_empty()
    }

    /// Deliver `event` to every live, handled listener that selects it.
    ///
    /// Listener failures are logged and do not stop the pass. Listeners may
    /// trigger further area transitions; nested events are fully delivered
    /// before the outer pass moves to its next listener.
    pub fn announce(&self, event: &AreaEvent) {
        let outer = self.current.replace(Some(event.clone()));

        let summary = self.handler.for_each_active(|listener| {
            if listener.area_event_selector().selects_event(event) {
                listener.on_area_event(event)
            } else {
                Ok(())
            }
        });
        tracing::trace!(
            area = %event.area().name(),
            change = %event.change(),
            handled = summary.handled,
            failed = summary.failed,
            "area event announced"
        );

        *self.current.borrow_mut() = outer;
    }
}

impl Handled for AreaListenerHandler {
    fn dead_operator(&self) -> &StateOperator {
        self.handler.dead_operator()
    }

    fn handling_operators(&self) -> &HandlingOperators {
        self.handler.handling_operators()
    }

    fn provide_capabilities(self: Rc<Self>, caps: &mut Capabilities) {
        caps.provide::<AreaListening>(self as Rc<dyn AreaListener>);
    }

    fn kill(&self) {
        self.handler.kill();
    }
}

impl AreaListener for AreaListenerHandler {
    fn area_event_selector(&self) -> &AreaEventSelector {
        &self.selector
    }

    fn on_area_event(&self, event: &AreaEvent) -> Result<(), DispatchError> {
        self.announce(event);
        Ok(())
    }
}

impl fmt::Debug for AreaListenerHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AreaListenerHandler")
            .field("handler", &self.handler)
            .field("dispatching", &self.current.borrow().is_some())
            .finish()
    }
}
