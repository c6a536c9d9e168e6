//! Test doubles shared by the dispatch tests.
//!
//! `Prop` is a minimal game object that can tick (and optionally draw) and
//! records every call in a shared log.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::handled::{Capabilities, Capability, Handled, HandlingOperators, SimpleHandled};
use super::state::StateOperator;
use crate::error::DispatchError;

pub(crate) type CallLog = Rc<RefCell<Vec<String>>>;

pub(crate) trait Tick: Handled {
    fn tick(&self, frame: u32) -> Result<(), DispatchError>;
}

pub(crate) trait Draw: Handled {
    fn draw(&self) -> Result<(), DispatchError>;
}

pub(crate) struct Ticking;

impl Capability for Ticking {
    type Target = dyn Tick;
    const NAME: &'static str = "tick";
}

pub(crate) struct Drawing;

impl Capability for Drawing {
    type Target = dyn Draw;
    const NAME: &'static str = "draw";
}

pub(crate) struct Prop {
    pub name: String,
    pub base: SimpleHandled,
    pub log: CallLog,
    pub fail: Cell<bool>,
    drawable: bool,
}

impl Prop {
    pub fn new(name: &str) -> Rc<Self> {
        Self::with_log(name, Rc::new(RefCell::new(Vec::new())), false)
    }

    pub fn drawable(name: &str) -> Rc<Self> {
        Self::with_log(name, Rc::new(RefCell::new(Vec::new())), true)
    }

    pub fn with_log(name: &str, log: CallLog, drawable: bool) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            base: SimpleHandled::new(),
            log,
            fail: Cell::new(false),
            drawable,
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

pub(crate) fn as_tick(prop: &Rc<Prop>) -> Rc<dyn Tick> {
    prop.clone()
}

impl Handled for Prop {
    fn dead_operator(&self) -> &StateOperator {
        self.base.dead()
    }

    fn handling_operators(&self) -> &HandlingOperators {
        self.base.handling()
    }

    fn provide_capabilities(self: Rc<Self>, caps: &mut Capabilities) {
        if self.drawable {
            caps.provide::<Drawing>(self.clone() as Rc<dyn Draw>);
        }
        caps.provide::<Ticking>(self as Rc<dyn Tick>);
    }
}

impl Tick for Prop {
    fn tick(&self, frame: u32) -> Result<(), DispatchError> {
        self.log.borrow_mut().push(format!("{}:tick{}", self.name, frame));
        if self.fail.get() {
            return Err(DispatchError::failed(format!("{} refused to tick", self.name)));
        }
        Ok(())
    }
}

impl Draw for Prop {
    fn draw(&self) -> Result<(), DispatchError> {
        self.log.borrow_mut().push(format!("{}:draw", self.name));
        Ok(())
    }
}
