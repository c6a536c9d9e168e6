//! State Operators
//!
//! A `StateOperator` is an observable boolean flag. Every activity flag in the
//! runtime is one: object liveness, "should this object be handled", area
//! activity.
//!
//! Rules:
//! - Setting the current value again is a no-op and notifies nobody
//! - Listeners run synchronously, in registration order, after the value changed
//! - A locked operator silently ignores every later mutation
//! - Listeners are held weakly and pruned lazily during notification
//!
//! Cloning a `StateOperator` shares the flag (both handles see the same value).
//! This is how dependent objects borrow their master's liveness.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Observer of a [`StateOperator`].
pub trait StateListener {
    /// Called after `source` changed to `new_state`.
    fn on_state_change(&self, source: &StateOperator, new_state: bool);
}

struct OperatorInner {
    state: Cell<bool>,
    mutable: Cell<bool>,
    /// Locks the operator the first time it becomes true
    latch: bool,
    listeners: RefCell<Vec<Weak<dyn StateListener>>>,
}

/// Shared, observable, optionally lockable boolean flag.
#[derive(Clone)]
pub struct StateOperator {
    inner: Rc<OperatorInner>,
}

impl StateOperator {
    /// Create an operator with the given state. `mutable == false` creates it locked.
    pub fn new(state: bool, mutable: bool) -> Self {
        Self::build(state, mutable, false)
    }

    /// Create an operator permanently fixed to `state`.
    pub fn fixed(state: bool) -> Self {
        Self::build(state, false, false)
    }

    /// Create an operator that locks itself once it becomes `true`.
    ///
    /// Liveness flags use this: a dead object stays dead.
    pub fn latch(state: bool) -> Self {
        Self::build(state, !state, true)
    }

    fn build(state: bool, mutable: bool, latch: bool) -> Self {
        Self {
            inner: Rc::new(OperatorInner {
                state: Cell::new(state),
                mutable: Cell::new(mutable),
                latch,
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Current value.
    pub fn state(&self) -> bool {
        self.inner.state.get()
    }

    /// Whether the value can still change.
    pub fn is_mutable(&self) -> bool {
        self.inner.mutable.get()
    }

    /// Forbid every future mutation. Cannot be undone.
    pub fn lock(&self) {
        self.inner.mutable.set(false);
    }

    /// Change the value and notify listeners.
    ///
    /// No-op when locked or when `state` equals the current value.
    pub fn set_state(&self, state: bool) {
        let inner = &self.inner;
        if !inner.mutable.get() || inner.state.get() == state {
            return;
        }

        inner.state.set(state);
        if inner.latch && state {
            inner.mutable.set(false);
        }
        tracing::trace!(state, "state operator changed");

        self.notify(state);
    }

    /// Flip the value (subject to the same rules as `set_state`).
    pub fn toggle(&self) {
        self.set_state(!self.state());
    }

    fn notify(&self, state: bool) {
        // Snapshot first: listeners may register / remove listeners or set
        // this operator again while being notified.
        let listeners: Vec<Rc<dyn StateListener>> = {
            let mut list = self.inner.listeners.borrow_mut();
            list.retain(|weak| weak.strong_count() > 0);
            list.iter().filter_map(Weak::upgrade).collect()
        };

        for listener in listeners {
            listener.on_state_change(self, state);
        }
    }

    /// Register a listener. Registering the same listener twice has no effect.
    ///
    /// The operator only keeps a weak reference; dropping the last `Rc`
    /// unsubscribes the listener.
    pub fn add_listener<L: StateListener + 'static>(&self, listener: &Rc<L>) {
        let weak = weak_listener(listener);
        let mut list = self.inner.listeners.borrow_mut();
        if list.iter().any(|existing| same_listener(existing, &weak)) {
            return;
        }
        list.push(weak);
    }

    /// Unregister a listener. Returns true if it was registered.
    pub fn remove_listener<L: StateListener + 'static>(&self, listener: &Rc<L>) -> bool {
        let weak = weak_listener(listener);
        let mut list = self.inner.listeners.borrow_mut();
        let before = list.len();
        list.retain(|existing| !same_listener(existing, &weak));
        list.len() < before
    }

    /// Number of listeners that are still alive.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// True if both handles refer to the same flag.
    pub fn ptr_eq(&self, other: &StateOperator) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

fn weak_listener<L: StateListener + 'static>(listener: &Rc<L>) -> Weak<dyn StateListener> {
    let weak: Weak<L> = Rc::downgrade(listener);
    weak
}

fn same_listener(a: &Weak<dyn StateListener>, b: &Weak<dyn StateListener>) -> bool {
    a.as_ptr() as *const () == b.as_ptr() as *const ()
}

impl Default for StateOperator {
    fn default() -> Self {
        Self::new(false, true)
    }
}

impl fmt::Debug for StateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateOperator")
            .field("state", &self.state())
            .field("mutable", &self.is_mutable())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
