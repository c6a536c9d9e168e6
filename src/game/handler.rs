//! Handlers
//!
//! A `Handler<C>` is an ordered fan-out over every object sharing capability
//! `C`. One dispatch pass visits members in insertion order and:
//! - skips dead members and prunes them after the pass
//! - skips members whose handling flag for this type is off
//! - isolates member failures (logged, the pass continues)
//!
//! Passes iterate over a snapshot of the member list, so members may add,
//! remove or kill objects (themselves included) while being dispatched to
//! without corrupting the sequence. Compaction happens once, at the end.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use super::handled::{Capability, Handled, HandlerType, HandlingOperators, SimpleHandled};
use super::state::StateOperator;
use crate::error::DispatchError;

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Members the operation succeeded on.
    pub handled: usize,
    /// Members skipped (dead or not handled right now).
    pub skipped: usize,
    /// Members whose operation returned an error.
    pub failed: usize,
    /// Dead members removed at the end of the pass.
    pub pruned: usize,
}

/// Ordered, deduplicated collection of objects with capability `C`.
pub struct Handler<C: Capability> {
    members: RefCell<Vec<Rc<C::Target>>>,
    base: SimpleHandled,
    handling_state: Cell<bool>,
    auto_death: bool,
    /// Set once the handler held at least one member (auto-death arms on it)
    had_members: Cell<bool>,
    _capability: PhantomData<C>,
}

impl<C: Capability> Handler<C> {
    /// Create an empty handler. With `auto_death`, the handler dies on the first
    /// pass that finds it empty after it once had members.
    pub fn new(auto_death: bool) -> Self {
        Self {
            members: RefCell::new(Vec::new()),
            base: SimpleHandled::new(),
            handling_state: Cell::new(true),
            auto_death,
            had_members: Cell::new(false),
            _capability: PhantomData,
        }
    }

    /// The capability this handler serves.
    pub fn handler_type(&self) -> HandlerType {
        HandlerType::of::<C>()
    }

    pub fn auto_death(&self) -> bool {
        self.auto_death
    }

    /// Add a member. Returns false if it was already present or the handler is dead.
    ///
    /// The member's handling flag for this type is synced to the handler's
    /// current handling state.
    pub fn add(&self, member: Rc<C::Target>) -> bool {
        if self.is_dead() {
            tracing::warn!(handler = %self.handler_type(), "ignoring add to a dead handler");
            return false;
        }
        if self.contains(&member) {
            return false;
        }

        // Sync before pushing: the flag's listeners may call back into us
        member
            .handling_operators()
            .operator(self.handler_type())
            .set_state(self.handling_state.get());

        self.members.borrow_mut().push(member);
        self.had_members.set(true);
        true
    }

    /// Remove a member. Returns true if it was present.
    pub fn remove(&self, member: &Rc<C::Target>) -> bool {
        let mut members = self.members.borrow_mut();
        let before = members.len();
        members.retain(|existing| !same_member::<C>(existing, member));
        members.len() < before
    }

    /// Drop every member.
    pub fn clear(&self) {
        self.members.borrow_mut().clear();
    }

    /// Mark the handler dead and drop its members.
    pub fn kill(&self) {
        self.base.dead().set_state(true);
        self.clear();
    }

    pub fn contains(&self, member: &Rc<C::Target>) -> bool {
        self.members
            .borrow()
            .iter()
            .any(|existing| same_member::<C>(existing, member))
    }

    pub fn len(&self) -> usize {
        self.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.borrow().is_empty()
    }

    /// Snapshot of the members, in dispatch order.
    pub fn members(&self) -> Vec<Rc<C::Target>> {
        self.members.borrow().clone()
    }

    /// Whether members are currently being handled.
    pub fn handling_state(&self) -> bool {
        self.handling_state.get()
    }

    /// Turn handling on or off, pushing the state into every member's
    /// handling flag for this type. Fixed member flags keep their value.
    pub fn set_handling_state(&self, state: bool) {
        self.handling_state.set(state);

        let handler_type = self.handler_type();
        for member in self.members() {
            member.handling_operators().operator(handler_type).set_state(state);
        }
    }

    /// Run `op` on every live, handled member in insertion order.
    ///
    /// A member returning an error is logged and skipped; the pass goes on.
    /// Dead members are compacted out after the pass. A dead handler does nothing.
    pub fn for_each_active<F>(&self, mut op: F) -> DispatchSummary
    where
        F: FnMut(&C::Target) -> Result<(), DispatchError>,
    {
        let mut summary = DispatchSummary::default();
        if self.is_dead() {
            return summary;
        }

        let handler_type = self.handler_type();
        let snapshot = self.members();

        for member in &snapshot {
            if member.is_dead() {
                summary.skipped += 1;
                continue;
            }
            if !member.handling_operators().should_be_handled(handler_type) {
                tracing::trace!(handler = %handler_type, "member not handled, skipping");
                summary.skipped += 1;
                continue;
            }

            match op(member.as_ref()) {
                Ok(()) => summary.handled += 1,
                Err(error) => {
                    summary.failed += 1;
                    tracing::warn!(handler = %handler_type, %error, "member dispatch failed");
                }
            }
        }

        summary.pruned = self.prune_dead();

        if self.auto_death && self.had_members.get() && self.is_empty() {
            tracing::debug!(handler = %handler_type, "handler ran out of members, dying");
            self.base.dead().set_state(true);
        }

        summary
    }

    fn prune_dead(&self) -> usize {
        let mut members = self.members.borrow_mut();
        let before = members.len();
        members.retain(|member| !member.is_dead());
        before - members.len()
    }
}

fn same_member<C: Capability>(a: &Rc<C::Target>, b: &Rc<C::Target>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

impl<C: Capability> Handled for Handler<C> {
    fn dead_operator(&self) -> &StateOperator {
        self.base.dead()
    }

    fn handling_operators(&self) -> &HandlingOperators {
        self.base.handling()
    }
}

impl<C: Capability> fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("type", &self.handler_type())
            .field("members", &self.len())
            .field("handling", &self.handling_state())
            .field("dead", &self.is_dead())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::testing::{as_tick, Prop, Tick, Ticking};

    fn tick_all(handler: &Handler<Ticking>, frame: u32) -> DispatchSummary {
        handler.for_each_active(|member| member.tick(frame))
    }

    #[test]
    fn test_dispatch_in_insertion_order() {
        let handler: Handler<Ticking> = Handler::new(false);
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Prop::with_log("a", log.clone(), false);
        let b = Prop::with_log("b", log.clone(), false);
        let c = Prop::with_log("c", log.clone(), false);
        handler.add(as_tick(&b));
        handler.add(as_tick(&a));
        handler.add(as_tick(&c));

        let summary = tick_all(&handler, 1);
        assert_eq!(summary.handled, 3);
        assert_eq!(*log.borrow(), vec!["b:tick1", "a:tick1", "c:tick1"]);
    }

    #[test]
    fn test_add_is_idempotent() {
        let handler: Handler<Ticking> = Handler::new(false);
        let prop = Prop::new("p");

        assert!(handler.add(as_tick(&prop)));
        assert!(!handler.add(as_tick(&prop)));
        assert_eq!(handler.len(), 1);

        tick_all(&handler, 0);
        assert_eq!(prop.calls(), vec!["p:tick0"]);
    }

    #[test]
    fn test_dead_members_pruned() {
        let handler: Handler<Ticking> = Handler::new(false);
        let alive = Prop::new("alive");
        let doomed = Prop::new("doomed");
        handler.add(as_tick(&doomed));
        handler.add(as_tick(&alive));

        doomed.kill();
        let summary = tick_all(&handler, 0);

        assert_eq!(summary.handled, 1);
        assert_eq!(summary.pruned, 1);
        assert_eq!(handler.len(), 1);
        assert!(doomed.calls().is_empty());
    }

    #[test]
    fn test_kill_during_pass_keeps_successor() {
        // A member that kills its neighbour and itself mid-pass
        struct Assassin {
            base: SimpleHandled,
            victim: Rc<Prop>,
        }
        impl Handled for Assassin {
            fn dead_operator(&self) -> &StateOperator {
                self.base.dead()
            }
            fn handling_operators(&self) -> &HandlingOperators {
                self.base.handling()
            }
        }
        impl Tick for Assassin {
            fn tick(&self, _frame: u32) -> Result<(), DispatchError> {
                self.victim.kill();
                self.kill();
                Ok(())
            }
        }

        let handler: Handler<Ticking> = Handler::new(false);
        let victim = Prop::new("victim");
        let survivor = Prop::new("survivor");
        let assassin = Rc::new(Assassin {
            base: SimpleHandled::new(),
            victim: victim.clone(),
        });

        handler.add(assassin.clone() as Rc<dyn Tick>);
        handler.add(as_tick(&victim));
        handler.add(as_tick(&survivor));

        let summary = tick_all(&handler, 7);
        assert_eq!(summary.handled, 2);
        assert_eq!(summary.pruned, 2);
        assert!(victim.calls().is_empty());
        assert_eq!(survivor.calls(), vec!["survivor:tick7"]);
        assert_eq!(handler.len(), 1);
    }

    #[test]
    fn test_member_added_during_pass() {
        struct Spawner {
            base: SimpleHandled,
            handler: Rc<Handler<Ticking>>,
            child: Rc<Prop>,
        }
        impl Handled for Spawner {
            fn dead_operator(&self) -> &StateOperator {
                self.base.dead()
            }
            fn handling_operators(&self) -> &HandlingOperators {
                self.base.handling()
            }
        }
        impl Tick for Spawner {
            fn tick(&self, _frame: u32) -> Result<(), DispatchError> {
                self.handler.add(as_tick(&self.child));
                Ok(())
            }
        }

        let handler: Rc<Handler<Ticking>> = Rc::new(Handler::new(false));
        let child = Prop::new("child");
        let spawner = Rc::new(Spawner {
            base: SimpleHandled::new(),
            handler: handler.clone(),
            child: child.clone(),
        });
        handler.add(spawner as Rc<dyn Tick>);

        tick_all(&handler, 1);
        // Joins the member list, but only from the next pass on
        assert_eq!(handler.len(), 2);
        assert!(child.calls().is_empty());

        tick_all(&handler, 2);
        assert_eq!(child.calls(), vec!["child:tick2"]);
    }

    #[test]
    fn test_failure_is_isolated() {
        let handler: Handler<Ticking> = Handler::new(false);
        let bad = Prop::new("bad");
        let good = Prop::new("good");
        bad.fail.set(true);
        handler.add(as_tick(&bad));
        handler.add(as_tick(&good));

        let summary = tick_all(&handler, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.handled, 1);
        assert_eq!(good.calls(), vec!["good:tick3"]);
        // Failing does not remove the member
        assert_eq!(handler.len(), 2);
    }

    #[test]
    fn test_handling_state_skips_members() {
        let handler: Handler<Ticking> = Handler::new(false);
        let prop = Prop::new("p");
        handler.add(as_tick(&prop));

        handler.set_handling_state(false);
        let summary = tick_all(&handler, 0);
        assert_eq!(summary.skipped, 1);
        assert!(prop.calls().is_empty());
        assert_eq!(handler.len(), 1);

        handler.set_handling_state(true);
        tick_all(&handler, 1);
        assert_eq!(prop.calls(), vec!["p:tick1"]);
    }

    #[test]
    fn test_member_added_while_off_is_synced() {
        let handler: Handler<Ticking> = Handler::new(false);
        handler.set_handling_state(false);

        let prop = Prop::new("late");
        handler.add(as_tick(&prop));
        tick_all(&handler, 0);
        assert!(prop.calls().is_empty());

        handler.set_handling_state(true);
        tick_all(&handler, 1);
        assert_eq!(prop.calls(), vec!["late:tick1"]);
    }

    #[test]
    fn test_fixed_handling_flag_ignores_pause() {
        let handler: Handler<Ticking> = Handler::new(false);
        let prop = Prop::new("always");
        prop
            .handling_operators()
            .set_operator(handler.handler_type(), StateOperator::fixed(true));
        handler.add(as_tick(&prop));

        handler.set_handling_state(false);
        tick_all(&handler, 4);
        assert_eq!(prop.calls(), vec!["always:tick4"]);
    }

    #[test]
    fn test_auto_death_on_next_pass() {
        let handler: Handler<Ticking> = Handler::new(true);

        // Never had members: stays alive
        tick_all(&handler, 0);
        assert!(!handler.is_dead());

        let prop = Prop::new("last");
        handler.add(as_tick(&prop));
        prop.kill();
        assert!(!handler.is_dead());

        tick_all(&handler, 1);
        assert!(handler.is_empty());
        assert!(handler.is_dead());
    }

    #[test]
    fn test_auto_death_after_clear_waits_for_pass() {
        let handler: Handler<Ticking> = Handler::new(true);
        let prop = Prop::new("p");
        handler.add(as_tick(&prop));

        handler.clear();
        assert!(!handler.is_dead());

        tick_all(&handler, 0);
        assert!(handler.is_dead());
    }

    #[test]
    fn test_no_auto_death_without_flag() {
        let handler: Handler<Ticking> = Handler::new(false);
        let prop = Prop::new("p");
        handler.add(as_tick(&prop));
        prop.kill();

        tick_all(&handler, 0);
        assert!(handler.is_empty());
        assert!(!handler.is_dead());
    }

    #[test]
    fn test_dead_handler_ignores_everything() {
        let handler: Handler<Ticking> = Handler::new(false);
        let prop = Prop::new("p");
        handler.add(as_tick(&prop));
        handler.kill();

        assert!(handler.is_empty());
        assert!(!handler.add(as_tick(&prop)));
        assert_eq!(tick_all(&handler, 0), DispatchSummary::default());
    }

    #[test]
    fn test_remove() {
        let handler: Handler<Ticking> = Handler::new(false);
        let prop = Prop::new("p");
        let tick = as_tick(&prop);
        handler.add(tick.clone());

        assert!(handler.contains(&tick));
        assert!(handler.remove(&tick));
        assert!(!handler.remove(&tick));
        assert!(handler.is_empty());
    }
}
