//! Areas
//!
//! An area is a named scope of game objects with its own lifecycle:
//!
//! ```text
//! INACTIVE --> ACTIVE <--> PAUSED
//!    ^           |           |
//!    +-----------+-----------+
//! ```
//!
//! The area owns a `HandlerRelay` and keeps its handlers in lockstep with its
//! state: handlers dispatch only while the area is ACTIVE. PAUSED keeps every
//! object registered but silent. Each actual transition is announced as an
//! `AreaEvent` through the area's `AreaListenerHandler`.
//!
//! Areas never destroy themselves; whoever owns them (usually an `AreaBank`)
//! decides when they are retired.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use super::descriptor::AreaDescriptor;
use super::event::AreaEvent;
use super::listener::{AreaListener, AreaListenerHandler};
use crate::game::{Handled, HandlerRelay, StateListener, StateOperator};

/// Lifecycle state of an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AreaState {
    /// Not started yet, or ended.
    #[default]
    Inactive,
    /// All objects present, handlers not dispatching.
    Paused,
    /// All objects present, handlers working normally.
    Active,
}

impl AreaState {
    pub fn label(&self) -> &'static str {
        match self {
            AreaState::Inactive => "inactive",
            AreaState::Paused => "paused",
            AreaState::Active => "active",
        }
    }
}

impl fmt::Display for AreaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named state machine owning a handler relay and a listener fan-out.
pub struct Area {
    this: Weak<Area>,
    descriptor: AreaDescriptor,
    state: Cell<AreaState>,
    /// Mirrors `state == Active` for flag-level observers
    activity: StateOperator,
    handlers: HandlerRelay,
    listeners: Rc<AreaListenerHandler>,
}

impl Area {
    /// Create an inactive area. The relay's handlers are switched off.
    pub fn new(name: impl Into<String>, handlers: HandlerRelay) -> Rc<Self> {
        Self::with_descriptor(AreaDescriptor::new(name), handlers)
    }

    /// Create an inactive area from a bank descriptor.
    pub fn with_descriptor(descriptor: AreaDescriptor, handlers: HandlerRelay) -> Rc<Self> {
        handlers.set_handling_states(false);

        Rc::new_cyclic(|this| Area {
            this: this.clone(),
            descriptor,
            state: Cell::new(AreaState::Inactive),
            activity: StateOperator::new(false, true),
            handlers,
            listeners: Rc::new(AreaListenerHandler::new(false)),
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &AreaDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> AreaState {
        self.state.get()
    }

    pub fn is_active(&self) -> bool {
        self.state.get() == AreaState::Active
    }

    /// The handlers objects in this area register with.
    pub fn handlers(&self) -> &HandlerRelay {
        &self.handlers
    }

    /// Fan-out informing area listeners about this area's transitions.
    pub fn listener_handler(&self) -> &Rc<AreaListenerHandler> {
        &self.listeners
    }

    /// Subscribe a listener to this area's transitions.
    pub fn add_listener(&self, listener: Rc<dyn AreaListener>) -> bool {
        self.listeners.add(listener)
    }

    /// Observe the area's activity as a plain boolean flag.
    pub fn add_activity_listener<L: StateListener + 'static>(&self, listener: &Rc<L>) {
        self.activity.add_listener(listener);
    }

    /// Move to `state`. Returns false (and announces nothing) if already there.
    ///
    /// Order: the state is updated, the relay's handlers are switched to match,
    /// then the transition is fanned out to the listeners. Listeners may change
    /// this or other areas' states again from inside the callback.
    pub fn set_state(&self, state: AreaState) -> bool {
        let previous = self.state.get();
        if previous == state {
            return false;
        }

        self.state.set(state);
        tracing::debug!(area = %self.name(), from = %previous, to = %state, "area state changed");

        self.handlers.set_handling_states(state == AreaState::Active);
        self.activity.set_state(state == AreaState::Active);

        if let Some(area) = self.this.upgrade() {
            let event = AreaEvent::new(area, previous, state);
            self.listeners.announce(&event);
        }
        true
    }

    /// Shorthand for `set_state(Active)`.
    pub fn start(&self) -> bool {
        self.set_state(AreaState::Active)
    }

    /// Shorthand for `set_state(Paused)`.
    pub fn pause(&self) -> bool {
        self.set_state(AreaState::Paused)
    }

    /// Shorthand for `set_state(Inactive)`.
    pub fn end(&self) -> bool {
        self.set_state(AreaState::Inactive)
    }

    /// End the area and kill its listener handler and every relay handler.
    ///
    /// The area stays usable as a value, but nothing is dispatched through it anymore.
    pub fn retire(&self) {
        self.end();
        self.listeners.kill();
        self.handlers.kill_all();
        tracing::debug!(area = %self.name(), "area retired");
    }
}

impl fmt::Debug for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Area")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("handlers", &self.handlers)
            .finish()
    }
}
