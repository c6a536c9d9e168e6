//! Area Events
//!
//! Every actual area state transition produces one `AreaEvent`. Listeners pick
//! the transitions they care about with an `AreaEventSelector`.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::area::{Area, AreaState};

/// A transition between two area states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaStateChange {
    pub previous: AreaState,
    pub new: AreaState,
}

impl AreaStateChange {
    pub fn new(previous: AreaState, new: AreaState) -> Self {
        Self { previous, new }
    }

    /// True if this change ends in `state` (coming from elsewhere).
    pub fn enters(&self, state: AreaState) -> bool {
        self.new == state && self.previous != state
    }

    /// True if this change starts from `state` (going elsewhere).
    pub fn leaves(&self, state: AreaState) -> bool {
        self.previous == state && self.new != state
    }
}

impl fmt::Display for AreaStateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.previous, self.new)
    }
}

/// An area changed state.
#[derive(Clone)]
pub struct AreaEvent {
    area: Rc<Area>,
    change: AreaStateChange,
}

impl AreaEvent {
    pub fn new(area: Rc<Area>, previous: AreaState, new: AreaState) -> Self {
        Self {
            area,
            change: AreaStateChange::new(previous, new),
        }
    }

    /// The area whose state changed.
    pub fn area(&self) -> &Rc<Area> {
        &self.area
    }

    pub fn change(&self) -> AreaStateChange {
        self.change
    }

    pub fn previous_state(&self) -> AreaState {
        self.change.previous
    }

    pub fn new_state(&self) -> AreaState {
        self.change.new
    }
}

impl fmt::Debug for AreaEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AreaEvent")
            .field("area", &self.area.name())
            .field("change", &self.change)
            .finish()
    }
}

/// Which area transitions a listener wants to hear about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AreaEventSelector {
    /// Every transition.
    #[default]
    All,
    /// Exactly `from -> to`.
    Exact { from: AreaState, to: AreaState },
    /// Any transition into the state.
    Entering(AreaState),
    /// Any transition out of the state.
    Leaving(AreaState),
    /// Any of the inner selectors.
    AnyOf(Vec<AreaEventSelector>),
}

impl AreaEventSelector {
    pub fn exact(from: AreaState, to: AreaState) -> Self {
        AreaEventSelector::Exact { from, to }
    }

    pub fn selects(&self, change: &AreaStateChange) -> bool {
        match self {
            AreaEventSelector::All => true,
            AreaEventSelector::Exact { from, to } => change.previous == *from && change.new == *to,
            AreaEventSelector::Entering(state) => change.enters(*state),
            AreaEventSelector::Leaving(state) => change.leaves(*state),
            AreaEventSelector::AnyOf(selectors) => selectors.iter().any(|s| s.selects(change)),
        }
    }

    pub fn selects_event(&self, event: &AreaEvent) -> bool {
        self.selects(&event.change)
    }
}
