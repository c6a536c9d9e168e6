//! Handled Objects and Capabilities
//!
//! Anything a [`Handler`](super::Handler) dispatches to is `Handled`: it has a
//! liveness flag and one "should be handled" flag per handler type.
//!
//! Capabilities are open-ended. A capability is a zero-sized marker type
//! implementing [`Capability`], naming the trait object its handler dispatches
//! to (`dyn AreaListener`, `dyn Drawable`, ...). Objects announce what they can
//! do once, at registration time, through `Handled::provide_capabilities`; the
//! relay then routes them to every matching handler. No central enum of
//! handler types exists, so collaborators can add their own.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::state::StateOperator;

/// Identity of a capability, used as the key of a handler in a relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerType {
    id: TypeId,
    name: &'static str,
}

impl HandlerType {
    /// The handler type served by capability `C`.
    pub fn of<C: Capability>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: C::NAME,
        }
    }

    /// Human-readable capability name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A dispatchable capability.
///
/// ```ignore
/// pub struct Drawing;
/// impl Capability for Drawing {
///     type Target = dyn Drawable;
///     const NAME: &'static str = "drawable";
/// }
/// ```
pub trait Capability: 'static {
    /// The capability interface members are dispatched through.
    type Target: ?Sized + Handled + 'static;

    /// Name used in logs and diagnostics.
    const NAME: &'static str;
}

/// Base contract of everything a handler can hold.
pub trait Handled {
    /// Liveness flag. Once true, every handler drops this object on its next pass.
    fn dead_operator(&self) -> &StateOperator;

    /// Per-handler-type "should be handled" flags.
    fn handling_operators(&self) -> &HandlingOperators;

    /// Announce the capabilities this object implements.
    ///
    /// Called once per `HandlerRelay::add_handled`. The default announces nothing.
    fn provide_capabilities(self: Rc<Self>, _caps: &mut Capabilities) {}

    /// Shorthand for the liveness flag's state.
    fn is_dead(&self) -> bool {
        self.dead_operator().state()
    }

    /// Mark this object dead.
    fn kill(&self) {
        self.dead_operator().set_state(true);
    }
}

/// The capability views an object exposes, keyed by capability.
#[derive(Default)]
pub struct Capabilities {
    provided: HashMap<TypeId, Box<dyn Any>>,
}

impl Capabilities {
    /// Collect the capabilities of `object`.
    pub fn of(object: Rc<dyn Handled>) -> Self {
        let mut caps = Self::default();
        object.provide_capabilities(&mut caps);
        caps
    }

    /// Offer `target` as this object's implementation of capability `C`.
    pub fn provide<C: Capability>(&mut self, target: Rc<C::Target>) {
        self.provided.insert(TypeId::of::<C>(), Box::new(target));
    }

    /// The object's view for capability `C`, if it provided one.
    pub fn get<C: Capability>(&self) -> Option<Rc<C::Target>> {
        self.provided
            .get(&TypeId::of::<C>())
            .and_then(|boxed| boxed.downcast_ref::<Rc<C::Target>>())
            .cloned()
    }

    /// Whether capability `C` was provided.
    pub fn supports<C: Capability>(&self) -> bool {
        self.provided.contains_key(&TypeId::of::<C>())
    }

    /// Number of provided capabilities.
    pub fn len(&self) -> usize {
        self.provided.len()
    }

    /// True if nothing was provided.
    pub fn is_empty(&self) -> bool {
        self.provided.is_empty()
    }
}

/// One "should be handled" flag per handler type.
///
/// Flags are created lazily with the default state. Installing a fixed
/// operator for a type pins the object's handling for that type regardless of
/// what its handlers push into it. Cloning shares the flags.
#[derive(Clone)]
pub struct HandlingOperators {
    inner: Rc<HandlingInner>,
}

struct HandlingInner {
    default_state: bool,
    operators: RefCell<HashMap<HandlerType, StateOperator>>,
}

impl HandlingOperators {
    /// Flags that start out as `default_state`.
    pub fn new(default_state: bool) -> Self {
        Self {
            inner: Rc::new(HandlingInner {
                default_state,
                operators: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// The flag for `handler_type`, created on first use.
    pub fn operator(&self, handler_type: HandlerType) -> StateOperator {
        self.inner
            .operators
            .borrow_mut()
            .entry(handler_type)
            .or_insert_with(|| StateOperator::new(self.inner.default_state, true))
            .clone()
    }

    /// Replace the flag for `handler_type`.
    pub fn set_operator(&self, handler_type: HandlerType, operator: StateOperator) {
        self.inner
            .operators
            .borrow_mut()
            .insert(handler_type, operator);
    }

    /// Current flag value for `handler_type`.
    pub fn should_be_handled(&self, handler_type: HandlerType) -> bool {
        match self.inner.operators.borrow().get(&handler_type) {
            Some(op) => op.state(),
            None => self.inner.default_state,
        }
    }

    /// Set every existing flag (locked ones stay as they are).
    pub fn set_all(&self, state: bool) {
        let operators: Vec<StateOperator> =
            self.inner.operators.borrow().values().cloned().collect();
        for op in operators {
            op.set_state(state);
        }
    }
}

impl Default for HandlingOperators {
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Debug for HandlingOperators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlingOperators")
            .field("default_state", &self.inner.default_state)
            .field("types", &self.inner.operators.borrow().len())
            .finish()
    }
}

/// Ready-made liveness + handling flags for embedding in game objects.
#[derive(Debug, Clone)]
pub struct SimpleHandled {
    dead: StateOperator,
    handling: HandlingOperators,
}

impl SimpleHandled {
    /// A live object, handled by default.
    pub fn new() -> Self {
        Self {
            dead: StateOperator::latch(false),
            handling: HandlingOperators::new(true),
        }
    }

    /// Flags shared with `master`: the dependent lives, dies and pauses with it.
    pub fn dependent_on(master: &dyn Handled) -> Self {
        Self {
            dead: master.dead_operator().clone(),
            handling: master.handling_operators().clone(),
        }
    }

    pub fn dead(&self) -> &StateOperator {
        &self.dead
    }

    pub fn handling(&self) -> &HandlingOperators {
        &self.handling
    }
}

impl Default for SimpleHandled {
    fn default() -> Self {
        Self::new()
    }
}

impl Handled for SimpleHandled {
    fn dead_operator(&self) -> &StateOperator {
        &self.dead
    }

    fn handling_operators(&self) -> &HandlingOperators {
        &self.handling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::testing::{Drawing, Prop, Ticking};

    #[test]
    fn test_handler_type_identity() {
        assert_eq!(HandlerType::of::<Ticking>(), HandlerType::of::<Ticking>());
        assert_ne!(HandlerType::of::<Ticking>(), HandlerType::of::<Drawing>());
        assert_eq!(HandlerType::of::<Ticking>().to_string(), "tick");
    }

    #[test]
    fn test_capabilities_of_object() {
        let plain = Prop::new("plain");
        let caps = Capabilities::of(plain);
        assert!(caps.supports::<Ticking>());
        assert!(!caps.supports::<Drawing>());
        assert_eq!(caps.len(), 1);

        let drawable = Prop::drawable("sprite");
        let caps = Capabilities::of(drawable);
        assert!(caps.supports::<Drawing>());
        assert!(caps.get::<Drawing>().is_some());
    }

    #[test]
    fn test_plain_handled_provides_nothing() {
        let caps = Capabilities::of(Rc::new(SimpleHandled::new()));
        assert!(caps.is_empty());
    }

    #[test]
    fn test_handling_operators_lazy_default() {
        let ops = HandlingOperators::new(true);
        let tick = HandlerType::of::<Ticking>();
        assert!(ops.should_be_handled(tick));

        ops.operator(tick).set_state(false);
        assert!(!ops.should_be_handled(tick));
        // Other types are independent
        assert!(ops.should_be_handled(HandlerType::of::<Drawing>()));
    }

    #[test]
    fn test_fixed_handling_operator_survives_set_all() {
        let ops = HandlingOperators::new(true);
        let tick = HandlerType::of::<Ticking>();
        let draw = HandlerType::of::<Drawing>();
        ops.set_operator(draw, StateOperator::fixed(true));
        ops.operator(tick);

        ops.set_all(false);
        assert!(!ops.should_be_handled(tick));
        assert!(ops.should_be_handled(draw));
    }

    #[test]
    fn test_dependent_shares_master_flags() {
        let master = SimpleHandled::new();
        let dependent = SimpleHandled::dependent_on(&master);

        master.kill();
        assert!(dependent.is_dead());

        let tick = HandlerType::of::<Ticking>();
        master.handling().operator(tick).set_state(false);
        assert!(!dependent.handling().should_be_handled(tick));
    }

    #[test]
    fn test_dead_stays_dead() {
        let handled = SimpleHandled::new();
        handled.kill();
        handled.dead().set_state(false);
        assert!(handled.is_dead());
    }
}
