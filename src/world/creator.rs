//! Area Object Creators
//!
//! An `AreaObjectCreator` populates an area each time it starts from INACTIVE
//! and kills everything it built once the area ends. Pausing and resuming
//! keeps the built objects alive.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::area::{Area, AreaState};
use super::event::{AreaEvent, AreaEventSelector};
use super::listener::{AreaListener, AreaListening};
use crate::error::{ConstructError, DispatchError};
use crate::game::{Capabilities, Handled, HandlingOperators, SimpleHandled, StateOperator};

/// Builds the game objects of an area.
pub trait ObjectConstructor {
    /// Build the objects for `area`. `file` is the area's object constructor
    /// file, when its descriptor names one.
    fn construct(&self, area: &Area, file: Option<&str>) -> Result<Vec<Rc<dyn Handled>>, ConstructError>;
}

impl<F> ObjectConstructor for F
where
    F: Fn(&Area, Option<&str>) -> Result<Vec<Rc<dyn Handled>>, ConstructError>,
{
    fn construct(&self, area: &Area, file: Option<&str>) -> Result<Vec<Rc<dyn Handled>>, ConstructError> {
        self(area, file)
    }
}

/// Area listener that constructs objects on start and kills them on end.
pub struct AreaObjectCreator {
    constructor: Rc<dyn ObjectConstructor>,
    selector: AreaEventSelector,
    base: SimpleHandled,
    constructs: RefCell<Vec<Rc<dyn Handled>>>,
}

impl AreaObjectCreator {
    /// Create a creator and subscribe it to `area`.
    pub fn attach(area: &Area, constructor: Rc<dyn ObjectConstructor>) -> Rc<Self> {
        let creator = Rc::new(Self {
            constructor,
            selector: AreaEventSelector::AnyOf(vec![
                AreaEventSelector::exact(AreaState::Inactive, AreaState::Active),
                AreaEventSelector::Entering(AreaState::Inactive),
            ]),
            base: SimpleHandled::new(),
            constructs: RefCell::new(Vec::new()),
        });
        area.add_listener(creator.clone());
        creator
    }

    /// Objects built for the current run of the area.
    pub fn constructs(&self) -> Vec<Rc<dyn Handled>> {
        self.constructs.borrow().clone()
    }

    fn build(&self, area: &Area) -> Result<(), DispatchError> {
        let file = area.descriptor().object_constructor_file.as_deref();
        let objects = match self.constructor.construct(area, file) {
            Ok(objects) => objects,
            Err(error) => {
                tracing::error!(area = %area.name(), %error, "object construction failed");
                return Err(error.into());
            }
        };

        tracing::debug!(area = %area.name(), count = objects.len(), "area objects constructed");
        for object in &objects {
            area.handlers().add_handled(object.clone());
        }
        self.constructs.borrow_mut().extend(objects);
        Ok(())
    }

    fn kill_constructs(&self) {
        let constructs = std::mem::take(&mut *self.constructs.borrow_mut());
        for object in constructs {
            object.kill();
        }
    }
}

impl Handled for AreaObjectCreator {
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

impl AreaListener for AreaObjectCreator {
    fn area_event_selector(&self) -> &AreaEventSelector {
        &self.selector
    }

    fn on_area_event(&self, event: &AreaEvent) -> Result<(), DispatchError> {
        match event.new_state() {
            AreaState::Active => self.build(event.area()),
            AreaState::Inactive => {
                self.kill_constructs();
                Ok(())
            }
            AreaState::Paused => Ok(()),
        }
    }
}

impl fmt::Debug for AreaObjectCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AreaObjectCreator")
            .field("constructs", &self.constructs.borrow().len())
            .finish()
    }
}
