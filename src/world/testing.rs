//! Test doubles for the area layer.

use std::cell::RefCell;
use std::rc::Rc;

use super::area::Area;
use super::event::{AreaEvent, AreaEventSelector, AreaStateChange};
use super::listener::{AreaListener, AreaListenerHandler, AreaListening};
use crate::error::DispatchError;
use crate::game::{Capabilities, Handled, HandlingOperators, SimpleHandled, StateOperator};

enum Reaction {
    Record,
    Fail,
    End(Rc<Area>),
    WatchCurrent(Rc<AreaListenerHandler>),
}

/// Area listener recording every event it receives.
pub(crate) struct EventRecorder {
    selector: AreaEventSelector,
    base: SimpleHandled,
    events: RefCell<Vec<AreaEvent>>,
    current: RefCell<Vec<Option<AreaStateChange>>>,
    reaction: Reaction,
}

impl EventRecorder {
    fn with_reaction(selector: AreaEventSelector, reaction: Reaction) -> Rc<Self> {
        Rc::new(Self {
            selector,
            base: SimpleHandled::new(),
            events: RefCell::new(Vec::new()),
            current: RefCell::new(Vec::new()),
            reaction,
        })
    }

    pub fn new(selector: AreaEventSelector) -> Rc<Self> {
        Self::with_reaction(selector, Reaction::Record)
    }

    /// Records, then reports a failure.
    pub fn failing(selector: AreaEventSelector) -> Rc<Self> {
        Self::with_reaction(selector, Reaction::Fail)
    }

    /// Records, then ends `other` from inside the callback.
    pub fn ending(selector: AreaEventSelector, other: Rc<Area>) -> Rc<Self> {
        Self::with_reaction(selector, Reaction::End(other))
    }

    /// Records, plus what `handler` reports as its current event.
    pub fn watching_current(selector: AreaEventSelector, handler: Rc<AreaListenerHandler>) -> Rc<Self> {
        Self::with_reaction(selector, Reaction::WatchCurrent(handler))
    }

    pub fn changes(&self) -> Vec<AreaStateChange> {
        self.events.borrow().iter().map(|e| e.change()).collect()
    }

    pub fn area_names(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .map(|e| e.area().name().to_string())
            .collect()
    }

    pub fn seen_current(&self) -> Vec<Option<AreaStateChange>> {
        self.current.borrow().clone()
    }
}

impl Handled for EventRecorder {
    fn dead_operator(&self) -> &StateOperator {
        self.base.dead()
    }

    fn handling_operators(&self) -> &HandlingOperators {
        self.base.handling()
    }

    fn provide_capabilities(self: Rc<Self>, caps: &mut Capabilities) {
        caps.provide::<AreaListening>(self as Rc<dyn AreaListener>);
    }
}

impl AreaListener for EventRecorder {
    fn area_event_selector(&self) -> &AreaEventSelector {
        &self.selector
    }

    fn on_area_event(&self, event: &AreaEvent) -> Result<(), DispatchError> {
        self.events.borrow_mut().push(event.clone());

        match &self.reaction {
            Reaction::Record => Ok(()),
            Reaction::Fail => Err(DispatchError::failed("recorder told to fail")),
            Reaction::End(other) => {
                other.end();
                Ok(())
            }
            Reaction::WatchCurrent(handler) => {
                let current = handler.current_event().map(|e| e.change());
                self.current.borrow_mut().push(current);
                Ok(())
            }
        }
    }
}
